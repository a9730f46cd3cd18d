//! SRV record lookup for `_minecraft._tcp.<host>`.
//!
//! Lookups never fail: DNS errors and empty answers both mean "no record".

use hickory_resolver::proto::rr::rdata::SRV;
use serde::{Deserialize, Serialize};

use crate::tokio::resolver;

/// A resolved SRV target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SrvRecord {
    pub host: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

impl From<&SRV> for SrvRecord {
    fn from(srv: &SRV) -> Self {
        let target = srv.target().to_utf8();
        Self {
            host: target.trim_end_matches('.').to_string(),
            port: srv.port(),
            priority: srv.priority(),
            weight: srv.weight(),
        }
    }
}

fn service_name(host: &str) -> String {
    format!("_minecraft._tcp.{host}")
}

/// Picks the record to use: lowest priority first, then highest weight.
#[must_use]
pub fn select(records: &[SrvRecord]) -> Option<&SrvRecord> {
    records
        .iter()
        .min_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)))
}

/// Every SRV record published for `host`, in answer order.
pub async fn all_srv_records(host: &str) -> Vec<SrvRecord> {
    let host = host.trim();
    if host.is_empty() {
        return Vec::new();
    }
    match resolver().srv_lookup(service_name(host)).await {
        Ok(lookup) => lookup.iter().map(SrvRecord::from).collect(),
        Err(error) => {
            debug!(host, %error, "no SRV records");
            Vec::new()
        }
    }
}

/// The preferred SRV record for `host`, if it has any.
pub async fn resolve_srv(host: &str) -> Option<SrvRecord> {
    let records = all_srv_records(host).await;
    let record = select(&records).cloned();
    if let Some(record) = &record {
        debug!(host, target = %record.host, port = record.port, "resolved SRV record");
    }
    record
}

/// Whether `host` publishes at least one SRV record.
pub async fn has_srv_records(host: &str) -> bool {
    resolve_srv(host).await.is_some()
}
