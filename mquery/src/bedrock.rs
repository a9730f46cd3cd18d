//! Implementation of the `RakNet` ping/pong protocol.
//! [Raknet: Unconnected Ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping)

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::{
    Error,
    java::{Players, Version},
    motd::Motd,
    srv::SrvRecord,
    tokio::{AsyncPingable, Transport, UdpTransport, bedrock_exchange, resolve_addrs},
};

/// Raknets default `OFFLINE_MESSAGE_DATA_ID`.
/// See more: [Raknet: Data Types](https://wiki.vg/Raknet_Protocol#Data_types)
pub const OFFLINE_MESSAGE_DATA_ID: &[u8] = &[
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

/// The default port of a Raknet Bedrock Server.
pub const DEFAULT_PORT: u16 = 19132;

/// Client GUID sent when none is configured.
pub const DEFAULT_CLIENT_GUID: u64 = 2;

/// Configuration for pinging a Bedrock server.
///
/// # Examples
///
/// ```
/// use mquery::Bedrock;
/// use std::time::Duration;
///
/// let bedrock_config = Bedrock {
///     host: "play.nethergames.org".to_string(),
///     timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Bedrock {
    /// The bedrock server host, an IP or a hostname.
    pub host: String,
    pub port: u16,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
    /// The GUID this client identifies itself with.
    pub client_guid: u64,
}

impl Default for Bedrock {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
            client_guid: DEFAULT_CLIENT_GUID,
        }
    }
}

impl AsyncPingable for Bedrock {
    type Response = BedrockResponse;

    /// The reported latency is always `0`; a single unconnected pong gives no
    /// reliable echo timing.
    async fn ping(self) -> Result<(u64, Self::Response), Error> {
        let deadline = self.timeout;
        let attempt = async {
            // datagrams give no sign of an unreachable address, so only the
            // preferred one is tried
            let addrs = resolve_addrs(&self.host, self.port).await?;
            let addr = *addrs.first().ok_or(Error::DnsLookupFailed)?;
            let mut transport = UdpTransport::connect(addr).await?;
            let result = bedrock_exchange(&mut transport, self.client_guid).await;
            transport.close().await;
            result
        };
        let response = tokio::time::timeout(deadline, attempt)
            .await
            .map_err(|_| Error::Timeout(crate::tokio::transport::millis(deadline)))??;
        Ok((0, response))
    }
}

/// Represents the edition of a bedrock server.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum BedrockEdition {
    PocketEdition,
    EducationEdition,
    /// An unknown edition string.
    Other(String),
}

impl std::fmt::Display for BedrockEdition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PocketEdition => f.write_str("MCPE"),
            Self::EducationEdition => f.write_str("MCEE"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for BedrockEdition {
    fn from(edition: &str) -> Self {
        match edition.to_lowercase().as_ref() {
            "mcpe" => Self::PocketEdition,
            "mcee" => Self::EducationEdition,
            _ => Self::Other(edition.to_string()),
        }
    }
}

impl Serialize for BedrockEdition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Bedrock Server Payload Response
///
/// Fields absent from the payload are empty, and numbers that fail to parse
/// are `0`.
///
/// See More: [Raknet: Unconnected Pong](https://wiki.vg/Raknet_Protocol#Unconnected_Pong)
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BedrockResponse {
    /// The GUID from the pong header.
    pub server_guid: u64,
    /// The server's edition.
    pub edition: BedrockEdition,
    /// The first line of the server's Message Of The Day (MOTD).
    pub motd_1: String,
    /// The server's protocol version (ex: 390).
    pub protocol_version: i32,
    /// The name of the servers version (ex: 1.16.200).
    pub version_name: String,
    pub players_online: i64,
    pub players_max: i64,
    /// The server unique ID, kept as text.
    pub server_id: String,
    /// The second line of the server's MOTD.
    ///
    /// In practice servers often put the server software name here.
    pub motd_2: String,
    /// The game mode the server defaults new users to (e.g. "Survival").
    pub game_mode: String,
    /// The numerical representation of `game_mode` (e.g. "1").
    pub game_mode_id: i64,
    /// The port to connect to the server on with an IPv4 address.
    pub port_v4: Option<u16>,
    /// The port to connect to the server on with an IPv6 address.
    pub port_v6: Option<u16>,
}

impl BedrockResponse {
    /// Extracts information from the semicolon-separated payload.
    ///
    /// Edition (MCPE or MCEE for Education Edition)
    /// MOTD line 1
    /// Protocol Version
    /// Version Name
    /// Player Count
    /// Max Player Count
    /// Server Unique ID
    /// MOTD line 2
    /// Game mode
    /// Game mode (numeric)
    /// Port (IPv4)
    /// Port (IPv6)
    #[must_use]
    pub fn extract(payload: &str, server_guid: u64) -> Self {
        let mut parts = payload.split(';');
        let mut text = || parts.next().unwrap_or_default().to_string();

        let edition = BedrockEdition::from(text().as_str());
        let motd_1 = text();
        let protocol_version = number(&text());
        let version_name = text();
        let players_online = number(&text());
        let players_max = number(&text());
        let server_id = text();
        let motd_2 = text();
        let game_mode = text();
        let game_mode_id = number(&text());
        let port_v4 = text().trim().parse().ok();
        let port_v6 = text().trim().parse().ok();

        Self {
            server_guid,
            edition,
            motd_1,
            protocol_version,
            version_name,
            players_online,
            players_max,
            server_id,
            motd_2,
            game_mode,
            game_mode_id,
            port_v4,
            port_v6,
        }
    }

    /// Both MOTD lines, joined by a newline when the second is present.
    #[must_use]
    pub fn motd_text(&self) -> String {
        if self.motd_2.is_empty() {
            self.motd_1.clone()
        } else {
            format!("{}\n{}", self.motd_1, self.motd_2)
        }
    }
}

fn number<T: std::str::FromStr + Default>(field: &str) -> T {
    field.trim().parse().unwrap_or_default()
}

/// Normalized status of a Bedrock server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockStatus {
    pub edition: BedrockEdition,
    pub version: Version,
    pub players: Players,
    pub motd: Motd,
    #[serde(rename = "serverGUID")]
    pub server_guid: u64,
    #[serde(rename = "serverID")]
    pub server_id: String,
    pub game_mode: String,
    pub game_mode_id: i64,
    #[serde(rename = "portIPv4")]
    pub port_ipv4: Option<u16>,
    #[serde(rename = "portIPv6")]
    pub port_ipv6: Option<u16>,
    pub srv_record: Option<SrvRecord>,
    /// Always `0` for Bedrock.
    pub round_trip_latency: u64,
}

impl BedrockStatus {
    pub(crate) fn new(response: BedrockResponse, srv_record: Option<SrvRecord>) -> Self {
        Self {
            motd: Motd::from_legacy(&response.motd_text()),
            edition: response.edition,
            version: Version {
                name: response.version_name,
                protocol: response.protocol_version,
            },
            players: Players {
                online: response.players_online,
                max: response.players_max,
                sample: None,
            },
            server_guid: response.server_guid,
            server_id: response.server_id,
            game_mode: response.game_mode,
            game_mode_id: response.game_mode_id,
            port_ipv4: response.port_v4,
            port_ipv6: response.port_v6,
            srv_record,
            round_trip_latency: 0,
        }
    }
}
