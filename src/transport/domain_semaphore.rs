//! Per-domain concurrency cap (spec.md §4.3: "no more than K in-flight
//! requests to the same domain at once, regardless of which shard serves
//! it").

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Lazily creates one `Semaphore` of size `max_per_domain` per domain seen,
/// backed by a `DashMap` so the common case (domain already has a
/// semaphore) never blocks on a global lock.
pub struct DomainSemaphores {
    max_per_domain: usize,
    semaphores: DashMap<String, Arc<Semaphore>>,
}

impl DomainSemaphores {
    pub fn new(max_per_domain: usize) -> Self {
        Self {
            max_per_domain: max_per_domain.max(1),
            semaphores: DashMap::new(),
        }
    }

    /// Acquire a permit for `domain`, creating its semaphore on first use.
    pub async fn acquire(&self, domain: &str) -> OwnedSemaphorePermit {
        let sem = self
            .semaphores
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_domain)))
            .clone();

        sem.acquire_owned().await.expect("domain semaphore closed")
    }

    pub fn tracked_domains(&self) -> usize {
        self.semaphores.len()
    }
}
