//! DNS resolver with persistent cache (C2).

mod cache;
mod resolver;
mod verdict;

pub use cache::DnsCache;
pub use resolver::{build_resolver, resolve_batch, BatchTally, ResolveProgress};
pub use verdict::{CacheRecord, DeadReason, Verdict};

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::DnsError;

/// Coordinates the persistent cache and the batch resolver behind the
/// public operations named in spec.md §4.2.
pub struct DnsService {
    cache: Arc<DnsCache>,
}

impl DnsService {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DnsCache::new()),
        }
    }

    pub fn load_cache(path: &Path) -> Result<(Self, usize), DnsError> {
        let (cache, count) = DnsCache::load(path)?;
        Ok((
            Self {
                cache: Arc::new(cache),
            },
            count,
        ))
    }

    pub fn save_cache(&self, path: &Path) -> Result<(), DnsError> {
        self.cache.save(path)
    }

    pub fn cache(&self) -> Arc<DnsCache> {
        self.cache.clone()
    }

    pub async fn resolve_batch(
        &self,
        domains: Vec<String>,
        workers: usize,
        timeout: Duration,
        nameservers: &[SocketAddr],
        on_progress: impl FnMut(ResolveProgress) + Send + 'static,
    ) -> Result<BatchTally, DnsError> {
        let resolver = Arc::new(build_resolver(nameservers, timeout)?);
        Ok(resolver::resolve_batch(&self.cache, domains, resolver, workers, timeout, on_progress).await)
    }
}

impl Default for DnsService {
    fn default() -> Self {
        Self::new()
    }
}
