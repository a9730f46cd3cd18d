//! Checked entry points for querying a single edition.

use tokio::time::Instant;

use crate::{
    BedrockStatus, JavaStatus, MinecraftServerError, QueryError, StatusOptions,
    bedrock::Bedrock,
    java::Java,
    options::Target,
    srv::{SrvRecord, resolve_srv},
    tokio::get_status,
};

/// Where a query actually connects, after SRV redirection.
struct Route {
    host: String,
    port: u16,
    srv_record: Option<SrvRecord>,
}

/// SRV lookup, address resolution and the exchange all share one deadline.
async fn route(target: &Target, options: &StatusOptions, deadline: Instant) -> Route {
    let direct = Route {
        host: target.host.clone(),
        port: target.port,
        srv_record: None,
    };
    if !options.srv_enabled() || target.host.parse::<std::net::IpAddr>().is_ok() {
        return direct;
    }
    match tokio::time::timeout_at(deadline, resolve_srv(&target.host)).await {
        Ok(Some(record)) => Route {
            host: record.host.clone(),
            port: record.port,
            srv_record: Some(record),
        },
        Ok(None) => direct,
        Err(_) => {
            debug!(host = %target.host, "SRV lookup timed out");
            direct
        }
    }
}

/// Queries a Java Edition server.
///
/// `port` is checked against `0..=65535`; [`crate::DEFAULT_JAVA_PORT`] is the
/// usual choice. When SRV lookup is enabled and a record exists, the query
/// goes to the record's target instead, but errors still name `host` and
/// `port` as given.
///
/// # Examples
///
/// ```no_run
/// # async {
/// let status = mquery::status("mc.hypixel.net", 25565, &Default::default()).await?;
/// println!("{}/{} online", status.players.online, status.players.max);
/// # Ok::<(), mquery::QueryError>(())
/// # };
/// ```
///
/// # Errors
/// [`QueryError::Validation`] for a blank host, out-of-range port or negative
/// timeout, before any I/O. [`QueryError::Server`] with code
/// `SERVER_OFFLINE` for any network or protocol failure.
pub async fn status(
    host: &str,
    port: impl Into<i64>,
    options: &StatusOptions,
) -> Result<JavaStatus, QueryError> {
    let target = Target::new(host, port.into())?;
    options.validate()?;

    let deadline = Instant::now() + options.timeout();
    let route = route(&target, options, deadline).await;
    debug!(host = %target.host, via = %route.host, port = route.port, "querying java status");
    let java = Java {
        host: route.host,
        port: route.port,
        timeout: deadline.saturating_duration_since(Instant::now()),
    };
    let (latency, response) = get_status(java).await.map_err(|error| {
        debug!(host = %target.host, %error, "java status failed");
        MinecraftServerError::offline(&target.host, target.port, error)
    })?;
    Ok(JavaStatus::new(response, latency, route.srv_record))
}

/// Queries a Bedrock Edition server.
///
/// Validation and SRV handling match [`status`]; the usual port is
/// [`crate::DEFAULT_BEDROCK_PORT`].
///
/// # Errors
/// As for [`status`].
pub async fn status_bedrock(
    host: &str,
    port: impl Into<i64>,
    options: &StatusOptions,
) -> Result<BedrockStatus, QueryError> {
    let target = Target::new(host, port.into())?;
    options.validate()?;

    let deadline = Instant::now() + options.timeout();
    let route = route(&target, options, deadline).await;
    debug!(host = %target.host, via = %route.host, port = route.port, "querying bedrock status");
    let bedrock = Bedrock {
        host: route.host,
        port: route.port,
        timeout: deadline.saturating_duration_since(Instant::now()),
        client_guid: options.client_guid(),
    };
    let (_, response) = get_status(bedrock).await.map_err(|error| {
        debug!(host = %target.host, %error, "bedrock status failed");
        MinecraftServerError::offline(&target.host, target.port, error)
    })?;
    Ok(BedrockStatus::new(response, route.srv_record))
}
