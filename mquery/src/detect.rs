//! Edition auto-detection.

use serde::Serialize;

use crate::{
    BedrockStatus, ErrorCode, JavaStatus, MinecraftServerError, QueryError, StatusOptions,
    options::{DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT, Target},
    status::{status, status_bedrock},
};

/// A status from whichever edition answered.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StatusResult {
    Java(JavaStatus),
    Bedrock(BedrockStatus),
}

impl StatusResult {
    #[must_use]
    pub const fn server_type(&self) -> ServerType {
        match self {
            Self::Java(_) => ServerType::Java,
            Self::Bedrock(_) => ServerType::Bedrock,
        }
    }
}

/// What kind of server, if any, answered at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Java,
    Bedrock,
    Offline,
}

impl std::fmt::Display for ServerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Java => "java",
            Self::Bedrock => "bedrock",
            Self::Offline => "offline",
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Edition {
    Java,
    Bedrock,
}

/// Queries `host` as one edition, then the other.
///
/// Each attempt gets half of the configured timeout. Without an explicit
/// `port`, Java is tried on 25565 and Bedrock on 19132. The attempts run one
/// after the other, Java first unless `try_java_first` is `false`.
///
/// # Examples
///
/// ```no_run
/// # async {
/// match mquery::auto_detect("play.example.com", None, &Default::default()).await? {
///     mquery::StatusResult::Java(status) => println!("java {}", status.version.name),
///     mquery::StatusResult::Bedrock(status) => println!("bedrock {}", status.version.name),
/// }
/// # Ok::<(), mquery::QueryError>(())
/// # };
/// ```
///
/// # Errors
/// [`QueryError::Validation`] for bad arguments. If neither edition answers,
/// a `SERVER_OFFLINE` [`MinecraftServerError`] naming `host` and the
/// requested port, or 25565 when none was given.
pub async fn auto_detect(
    host: &str,
    port: Option<i64>,
    options: &StatusOptions,
) -> Result<StatusResult, QueryError> {
    let java_port = port.unwrap_or(DEFAULT_JAVA_PORT.into());
    let bedrock_port = port.unwrap_or(DEFAULT_BEDROCK_PORT.into());
    let target = Target::new(host, java_port)?;
    options.validate()?;

    let attempt = options.halved();
    let order = if options.try_java_first() {
        [Edition::Java, Edition::Bedrock]
    } else {
        [Edition::Bedrock, Edition::Java]
    };

    for edition in order {
        let result = match edition {
            Edition::Java => status(host, java_port, &attempt)
                .await
                .map(StatusResult::Java),
            Edition::Bedrock => status_bedrock(host, bedrock_port, &attempt)
                .await
                .map(StatusResult::Bedrock),
        };
        match result {
            Ok(found) => {
                debug!(host = %target.host, ?edition, "detected server edition");
                return Ok(found);
            }
            Err(QueryError::Server(error)) => {
                debug!(host = %target.host, ?edition, %error, "edition attempt failed");
            }
            Err(error @ QueryError::Validation(_)) => return Err(error),
        }
    }

    Err(MinecraftServerError {
        message: "Server is offline or unreachable on both Java and Bedrock protocols".into(),
        code: ErrorCode::ServerOffline,
        host: target.host,
        port: target.port,
        source: None,
    }
    .into())
}

/// Whether anything answers at `host`. Never fails.
pub async fn is_online(host: &str, port: Option<i64>, options: &StatusOptions) -> bool {
    auto_detect(host, port, options).await.is_ok()
}

/// The edition answering at `host`, or [`ServerType::Offline`]. Never fails.
pub async fn server_type(host: &str, port: Option<i64>, options: &StatusOptions) -> ServerType {
    auto_detect(host, port, options)
        .await
        .map_or(ServerType::Offline, |result| result.server_type())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::testing;

    fn options(timeout: i64, try_java_first: bool) -> StatusOptions {
        StatusOptions {
            timeout: Some(timeout),
            enable_srv: Some(false),
            try_java_first: Some(try_java_first),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn falls_back_to_bedrock() {
        // nothing listens on tcp, so the java attempt is refused
        let (addr, server) = testing::bedrock_server().await;
        let result = auto_detect("127.0.0.1", Some(addr.port().into()), &options(2000, true))
            .await
            .unwrap();
        assert_eq!(result.server_type(), ServerType::Bedrock);
        let StatusResult::Bedrock(status) = result else {
            unreachable!();
        };
        assert_eq!(status.game_mode, "Survival");
        server.abort();
    }

    #[tokio::test]
    async fn falls_back_to_java() {
        let (addr, server) = testing::java_server().await;
        let result = auto_detect("127.0.0.1", Some(addr.port().into()), &options(1000, false))
            .await
            .unwrap();
        let StatusResult::Java(status) = result else {
            panic!("expected java");
        };
        assert_eq!(status.players.max, 50);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn java_first_wins_when_it_answers() {
        let (addr, server) = testing::java_server().await;
        let result = auto_detect("127.0.0.1", Some(addr.port().into()), &options(1000, true))
            .await
            .unwrap();
        assert_eq!(result.server_type(), ServerType::Java);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn offline_after_both_halves() {
        let (port, _listener, _socket) = testing::silent_server().await;
        let started = Instant::now();
        let Err(QueryError::Server(error)) =
            auto_detect(" 127.0.0.1", Some(port.into()), &options(400, true)).await
        else {
            panic!("expected a server error");
        };
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(error.code, ErrorCode::ServerOffline);
        assert_eq!(error.host, "127.0.0.1");
        assert_eq!(error.port, port);
        assert!(error.source.is_none());
    }

    #[tokio::test]
    async fn validation_is_not_swallowed() {
        let error = auto_detect("", None, &StatusOptions::default()).await.unwrap_err();
        assert!(matches!(error, QueryError::Validation(_)));
        let error = auto_detect("localhost", Some(-5), &StatusOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, QueryError::Validation(_)));
    }

    #[tokio::test]
    async fn wrappers_never_fail() {
        assert!(!is_online("", None, &StatusOptions::default()).await);
        assert_eq!(
            server_type("", None, &StatusOptions::default()).await,
            ServerType::Offline
        );

        let (port, _listener, _socket) = testing::silent_server().await;
        assert!(!is_online("127.0.0.1", Some(port.into()), &options(100, true)).await);
        assert_eq!(
            server_type("127.0.0.1", Some(port.into()), &options(100, false)).await,
            ServerType::Offline
        );

        let (addr, server) = testing::bedrock_server().await;
        assert!(is_online("127.0.0.1", Some(addr.port().into()), &options(1000, true)).await);
        assert_eq!(
            server_type("127.0.0.1", Some(addr.port().into()), &options(1000, false)).await,
            ServerType::Bedrock
        );
        server.abort();
    }

    #[test]
    fn result_serializes_tagged() {
        let response = crate::BedrockResponse::extract("MCPE;Hi;1;1.0;1;2", 0);
        let value = serde_json::to_value(StatusResult::Bedrock(BedrockStatus::new(response, None)))
            .unwrap();
        assert_eq!(value["type"], "bedrock");
        assert_eq!(value["data"]["edition"], "MCPE");
    }
}
