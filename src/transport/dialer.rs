//! Custom address resolver shared by every transport shard: a single,
//! immutable view over the DNS cache (C2) feeds `reqwest`'s resolver hook
//! (spec.md §4.3 "custom address dialer").

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use crate::dns::DnsCache;

/// Error returned when the dialer short-circuits a known-dead domain
/// without issuing a network call.
#[derive(Debug, thiserror::Error)]
#[error("dns_dead: {0}")]
pub struct DnsDeadError(pub String);

/// Resolves hostnames against the shared DNS cache, falling through to the
/// system resolver (via `tokio::net::lookup_host`) for domains the cache has
/// no opinion on yet — prefetch is best-effort, not a hard precondition.
#[derive(Clone)]
pub struct CachedDialer {
    cache: Arc<DnsCache>,
}

impl CachedDialer {
    pub fn new(cache: Arc<DnsCache>) -> Self {
        Self { cache }
    }
}

impl Resolve for CachedDialer {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = self.cache.clone();

        Box::pin(async move {
            let host = name.as_str();

            if let Some(verdict) = cache.get(host) {
                if verdict.is_dead_or_timeout() {
                    return Err(Box::new(DnsDeadError(host.to_string()))
                        as Box<dyn std::error::Error + Send + Sync>);
                }

                let ips = verdict.ips();
                if !ips.is_empty() {
                    let addrs: Vec<SocketAddr> = ips
                        .iter()
                        .filter_map(|ip| ip.parse::<IpAddr>().ok())
                        .map(|ip| SocketAddr::new(ip, 0))
                        .collect();
                    if !addrs.is_empty() {
                        let boxed: Addrs = Box::new(addrs.into_iter());
                        return Ok(boxed);
                    }
                }
            }

            let lookup = format!("{host}:0");
            let resolved = tokio::net::lookup_host(lookup).await?;
            let boxed: Addrs = Box::new(resolved.into_iter());
            Ok(boxed)
        })
    }
}
