use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default deadline for a query, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;
pub const DEFAULT_JAVA_PORT: u16 = 25565;
pub const DEFAULT_BEDROCK_PORT: u16 = crate::bedrock::DEFAULT_PORT;

/// Arguments rejected before any network I/O.
///
/// These signal misuse by the caller and are never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected `host` to have a length greater than 0")]
    EmptyHost,
    #[error("expected `port` to be between 0 and 65535, got `{0}`")]
    PortOutOfRange(i64),
    #[error("expected `port` to be an integer, got `{0}`")]
    InvalidPort(String),
    #[error("expected `options.timeout` to be greater than or equal to 0, got `{0}`")]
    NegativeTimeout(i64),
}

/// Splits `host`, `host:port`, `[v6]` or `[v6]:port` into host and port.
///
/// A bare IPv6 address is taken as a host without a port. The port is not
/// range-checked here; the query functions do that.
///
/// # Errors
/// If the port part is not an integer.
pub fn split_address(address: &str) -> Result<(&str, Option<i64>), ValidationError> {
    let address = address.trim();
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        match rest.split_once(']') {
            Some((host, "")) => (host, None),
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (address, None),
        }
    } else {
        match address.split_once(':') {
            Some((host, port)) if !port.contains(':') => (host, Some(port)),
            _ => (address, None),
        }
    };
    let port = port
        .map(|port| {
            port.parse()
                .map_err(|_| ValidationError::InvalidPort(port.to_string()))
        })
        .transpose()?;
    Ok((host, port))
}

/// Options shared by every query.
///
/// Every field is optional; [`StatusOptions::default`] gives a 5 second
/// timeout with SRV lookup enabled and Java tried first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusOptions {
    /// Deadline in milliseconds. Auto-detection gives each edition half.
    pub timeout: Option<i64>,
    /// Look up `_minecraft._tcp.<host>` first.
    #[serde(rename = "enableSRV")]
    pub enable_srv: Option<bool>,
    /// Accepted for Java queries; the handshake always announces version 47.
    pub protocol: Option<i32>,
    /// Auto-detection order.
    pub try_java_first: Option<bool>,
    /// GUID sent in Bedrock pings.
    #[serde(rename = "clientGUID")]
    pub client_guid: Option<u64>,
}

impl StatusOptions {
    /// # Errors
    /// If the timeout is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.timeout {
            Some(timeout) if timeout < 0 => Err(ValidationError::NegativeTimeout(timeout)),
            _ => Ok(()),
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        let millis = self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);
        Duration::from_millis(u64::try_from(millis).unwrap_or_default())
    }

    pub(crate) fn srv_enabled(&self) -> bool {
        self.enable_srv != Some(false)
    }

    pub(crate) fn try_java_first(&self) -> bool {
        self.try_java_first.unwrap_or(true)
    }

    pub(crate) fn client_guid(&self) -> u64 {
        self.client_guid
            .unwrap_or(crate::bedrock::DEFAULT_CLIENT_GUID)
    }

    /// The options for one auto-detection attempt: same settings, half the
    /// time.
    pub(crate) fn halved(&self) -> Self {
        Self {
            timeout: Some(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS) / 2),
            ..self.clone()
        }
    }
}

/// A validated host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: &str, port: i64) -> Result<Self, ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ValidationError::EmptyHost);
        }
        let port = u16::try_from(port).map_err(|_| ValidationError::PortOutOfRange(port))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}
