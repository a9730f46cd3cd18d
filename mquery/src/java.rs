//! Implementation of the Java Minecraft ping protocol.
//! [Server List Ping](https://wiki.vg/Server_List_Ping)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    motd::{Chat, Motd},
    srv::SrvRecord,
    tokio::{AsyncPingable, TcpTransport, Transport, java_exchange, resolve_addrs},
};

/// Protocol version sent in the handshake.
///
/// Fixed rather than negotiated; servers answer status requests regardless of
/// the version a client announces.
pub const PROTOCOL_VERSION: i32 = 47;

/// Configuration for pinging a Java server.
///
/// # Examples
///
/// ```
/// use mquery::Java;
/// use std::time::Duration;
///
/// let java_config = Java {
///     host: "mc.hypixel.net".to_string(),
///     port: 25565,
///     timeout: Duration::from_secs(10),
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Java {
    /// The host to connect to, and to announce in the handshake.
    ///
    /// Either an IP or a hostname; hostnames are resolved, SRV records are not
    /// consulted at this level.
    pub host: String,
    pub port: u16,
    /// Deadline for the whole exchange, connection included.
    pub timeout: Duration,
}

impl AsyncPingable for Java {
    type Response = JavaResponse;

    async fn ping(self) -> Result<(u64, Self::Response), Error> {
        let deadline = self.timeout;
        let attempt = async {
            let addrs = resolve_addrs(&self.host, self.port).await?;
            let mut transport = TcpTransport::connect_any(&addrs, deadline).await?;
            let result = java_exchange(&mut transport, &self.host, self.port).await;
            transport.close().await;
            result
        };
        tokio::time::timeout(deadline, attempt)
            .await
            .map_err(|_| Error::Timeout(crate::tokio::transport::millis(deadline)))?
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForgeModMetadata {
    pub modid: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForgeModInfoList {
    #[serde(rename = "modList")]
    pub mod_list: Vec<ForgeModMetadata>,
}

/// Mod loader information some modded servers attach. Carried through
/// untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ModInfo {
    #[serde(rename = "FML")]
    Fml(ForgeModInfoList),
}

/// The server status reponse
///
/// More information can be found [here](https://wiki.vg/Server_List_Ping).
#[derive(Debug, Clone, Deserialize)]
pub struct JavaResponse {
    /// The version of the server.
    pub version: Version,
    /// Information about online players
    pub players: Players,
    /// The description of the server (MOTD).
    #[serde(default)]
    pub description: Chat,
    /// The server icon (a Base64-encoded PNG image)
    pub favicon: Option<String>,
    /// Mod information
    pub modinfo: Option<ModInfo>,
    /// Does this server enforce server signing?
    #[serde(rename = "enforcesSecureChat")]
    pub enforces_secure_chat: Option<bool>,
}

/// Information about the server's version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Version {
    /// The name of the version the server is running
    ///
    /// In practice this comes in a large variety of different formats.
    pub name: String,
    /// See [Protocol Version Numbers](https://wiki.vg/Protocol_version_numbers)
    pub protocol: i32,
}

/// An online player of the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Player {
    /// The name of the player.
    pub name: String,
    /// The player's UUID
    pub id: String,
}

/// The stats for players on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Players {
    /// The max amount of players.
    pub max: i64,
    /// The amount of players online.
    pub online: i64,
    /// A preview of which players are online
    ///
    /// In practice servers often don't send this or use it for more advertising
    pub sample: Option<Vec<Player>>,
}

/// Normalized status of a Java server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaStatus {
    pub version: Version,
    pub players: Players,
    pub motd: Motd,
    pub favicon: Option<String>,
    /// The SRV record the query was redirected through, if any.
    pub srv_record: Option<SrvRecord>,
    /// Milliseconds between sending the ping and receiving the matching pong.
    pub round_trip_latency: u64,
}

impl JavaStatus {
    pub(crate) fn new(response: JavaResponse, latency: u64, srv_record: Option<SrvRecord>) -> Self {
        Self {
            motd: Motd::from_chat(&response.description),
            version: response.version,
            players: response.players,
            favicon: response.favicon,
            srv_record,
            round_trip_latency: latency,
        }
    }
}
