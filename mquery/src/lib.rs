#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
//! `mquery` queries the live status of a Minecraft server without joining it.
//! It collects the MOTD, player counts, version, favicon and latency.
//!
//! Both editions are supported: Java servers through the Server List Ping
//! exchange over TCP, Bedrock servers through the `RakNet` unconnected
//! ping/pong over UDP. When the edition is not known up front,
//! [`auto_detect`] tries one protocol and falls back to the other.
//!
//! The main API surface is [`status`], [`status_bedrock`] and [`auto_detect`].

#[macro_use]
extern crate tracing;

pub mod motd;
pub mod srv;
pub mod tokio;
pub mod varint;

mod bedrock;
mod detect;
mod java;
mod options;
mod status;
#[cfg(test)]
mod testing;

pub use bedrock::{Bedrock, BedrockEdition, BedrockResponse, BedrockStatus};
pub use detect::{ServerType, StatusResult, auto_detect, is_online, server_type};
pub use java::{
    ForgeModInfoList, ForgeModMetadata, Java, JavaResponse, JavaStatus, ModInfo, PROTOCOL_VERSION,
    Player, Players, Version,
};
pub use motd::{Chat, Motd};
pub use options::{
    DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT, DEFAULT_TIMEOUT_MS, StatusOptions, ValidationError,
    split_address,
};
pub use srv::{SrvRecord, all_srv_records, has_srv_records, resolve_srv};
pub use status::{status, status_bedrock};

/// Errors that can occur on the wire while pinging a server.
///
/// These are the causes behind a [`MinecraftServerError`]; the public entry
/// points never return them directly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected server to send packet type {expected:#04x}, received {received:#04x}")]
    InvalidPacket { expected: i32, received: i32 },
    #[error("ping payload did not match received payload")]
    PayloadMismatch { sent: i64, received: i64 },
    #[error("VarInt is too big")]
    VarIntTooLong,
    #[error("length {actual} exceeds the maximum of {max} bytes")]
    LengthTooLarge { max: usize, actual: usize },
    #[error("VarInt length was negative or too large")]
    InvalidVarInt(#[from] std::num::TryFromIntError),
    #[error("an I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),
    #[error("a JSON error occurred: {0}")]
    JsonErr(#[from] serde_json::Error),
    #[error("response string was not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("connection closed before {wanted} bytes could be read")]
    ConnectionClosed { wanted: usize },
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("DNS lookup for the host provided failed")]
    DnsLookupFailed,
}

impl Error {
    /// The most specific [`ErrorCode`] describing this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::IoError(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                ErrorCode::ConnectionRefused
            }
            Self::IoError(e) if e.kind() == std::io::ErrorKind::TimedOut => ErrorCode::Timeout,
            Self::InvalidPacket { .. }
            | Self::PayloadMismatch { .. }
            | Self::VarIntTooLong
            | Self::LengthTooLarge { .. }
            | Self::InvalidVarInt(_)
            | Self::JsonErr(_)
            | Self::InvalidUtf8(_) => ErrorCode::InvalidResponse,
            Self::IoError(_) | Self::ConnectionClosed { .. } | Self::DnsLookupFailed => {
                ErrorCode::ServerOffline
            }
        }
    }
}

/// Classification carried by a [`MinecraftServerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Timeout,
    ConnectionRefused,
    InvalidResponse,
    UnsupportedProtocol,
    AuthenticationFailed,
    ServerOffline,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::ServerOffline => "SERVER_OFFLINE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server could not be queried.
///
/// `host` is the trimmed host and `port` the port the caller asked for, even
/// when an SRV record redirected the attempt elsewhere.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct MinecraftServerError {
    pub message: String,
    pub code: ErrorCode,
    pub host: String,
    pub port: u16,
    #[source]
    pub source: Option<Error>,
}

impl MinecraftServerError {
    pub(crate) fn offline(host: &str, port: u16, source: Error) -> Self {
        Self {
            message: source.to_string(),
            code: ErrorCode::ServerOffline,
            host: host.to_string(),
            port,
            source: Some(source),
        }
    }

    /// The finer classification of the underlying failure, if there was one.
    #[must_use]
    pub fn cause_code(&self) -> ErrorCode {
        self.source.as_ref().map_or(self.code, Error::code)
    }
}

/// Everything a public query can fail with.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The arguments were rejected before any I/O took place.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Server(#[from] MinecraftServerError),
}
