//! Async protocol clients on top of the tokio runtime.

mod bedrock;
mod java;
pub mod transport;

use std::{
    net::{IpAddr, SocketAddr},
    sync::OnceLock,
};

use hickory_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
};

pub use transport::{StreamTransport, TcpTransport, Transport, UdpTransport};

use crate::Error;

pub(crate) use bedrock::exchange as bedrock_exchange;
pub(crate) use java::exchange as java_exchange;

/// Represents a pingable entity.
pub trait AsyncPingable {
    /// The type of response that is expected in reply to the ping.
    type Response;

    /// Ping the entity, gathering the latency and response.
    fn ping(self)
    -> impl std::future::Future<Output = Result<(u64, Self::Response), Error>> + Send;
}

/// Retrieve the status of a given Minecraft server using a `AsyncPingable` configuration.
///
/// Returns `(latency_ms, response)` where response is a response type of the
/// `AsyncPingable` configuration. No input validation or SRV lookup happens
/// here; see [`crate::status`] for the checked entry point.
///
/// # Examples
///
/// Ping a Java server, giving up after five seconds:
///
/// ```no_run
/// # async {
/// use std::time::Duration;
///
/// let (latency, response) = mquery::tokio::get_status(mquery::Java {
///     host: "mc.hypixel.net".into(),
///     port: 25565,
///     timeout: Duration::from_secs(5),
/// }).await?;
/// # Ok::<(), mquery::Error>(())
/// # };
/// ```
///
/// Ping a Bedrock server:
///
/// ```no_run
/// # async {
/// let (_, response) = mquery::tokio::get_status(mquery::Bedrock {
///     host: "play.nethergames.org".into(),
///     ..Default::default()
/// }).await?;
/// # Ok::<(), mquery::Error>(())
/// # };
/// ```
///
/// # Errors
/// If the server status cannot be received
pub async fn get_status<P: AsyncPingable + Send>(pingable: P) -> Result<(u64, P::Response), Error> {
    pingable.ping().await
}

fn new_resolver() -> TokioAsyncResolver {
    let config = ResolverConfig::cloudflare();
    let mut opts = ResolverOpts::default();
    opts.cache_size = 64;
    opts.attempts = 3;
    TokioAsyncResolver::tokio(config, opts)
}

pub fn resolver() -> &'static TokioAsyncResolver {
    static RESOLVER: OnceLock<TokioAsyncResolver> = OnceLock::new();
    RESOLVER.get_or_init(new_resolver)
}

/// Turns a host and port into socket addresses, skipping DNS for IP
/// literals. IPv4 addresses come first; the result is never empty.
///
/// # Errors
/// [`Error::DnsLookupFailed`] if the name has no addresses.
pub async fn resolve_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let lookup = resolver().lookup_ip(host).await.map_err(|error| {
        debug!(host, %error, "address lookup failed");
        Error::DnsLookupFailed
    })?;
    let addrs = prefer_ipv4(lookup.iter().map(|ip| SocketAddr::new(ip, port)).collect());
    if addrs.is_empty() {
        return Err(Error::DnsLookupFailed);
    }
    trace!(host, ?addrs, "resolved addresses");
    Ok(addrs)
}

fn prefer_ipv4(mut addrs: Vec<SocketAddr>) -> Vec<SocketAddr> {
    addrs.sort_by_key(SocketAddr::is_ipv6);
    addrs
}
