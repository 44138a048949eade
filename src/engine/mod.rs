//! Recrawl engine (C4): bounded worker pool consuming seeds, issuing
//! fetches, capturing per-URL outcomes, feeding the result store.

mod outcome;
mod worker;

pub use outcome::{Outcome, SkipReason, UrlOutcome};
pub use worker::RetryPolicy;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::dns::DnsCache;
use crate::seeds::Seed;
use crate::stats::Stats;
use crate::store::ResultStore;
use crate::transport::Transport;

/// Everything the engine needs beyond the seeds themselves.
pub struct EngineConfig {
    pub workers: usize,
    pub retry: RetryPolicy,
}

/// `run(seeds, skip_set, stats) -> error` (spec.md §4.4).
///
/// Skips seeds already present in `skip_set` (resume), skips seeds whose
/// domain is known-dead in `dns_cache` without issuing network I/O, and
/// otherwise fetches through `transport`, writing every terminal outcome to
/// `store`. Returns once the feeder has exhausted `seeds` and every worker
/// has drained, or immediately once `cancel` fires and in-flight work
/// finishes its current suspension point.
pub async fn run(
    seeds: Vec<Seed>,
    skip_set: Arc<HashSet<String>>,
    stats: Arc<Stats>,
    transport: Arc<Transport>,
    dns_cache: Arc<DnsCache>,
    store: Arc<ResultStore>,
    cancel: CancellationToken,
    config: EngineConfig,
) {
    let runnable: Vec<Seed> = seeds.into_iter().filter(|s| !skip_set.contains(&s.url)).collect();
    stats.set_total(runnable.len() as u64);

    let (tx, rx) = async_channel::unbounded::<Seed>();

    let feeder_cancel = cancel.clone();
    let feeder = tokio::spawn(async move {
        for seed in runnable {
            if feeder_cancel.is_cancelled() {
                break;
            }
            if tx.send(seed).await.is_err() {
                break;
            }
        }
    });

    let worker_count = config.workers.max(1);
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = rx.clone();
        let transport = transport.clone();
        let dns_cache = dns_cache.clone();
        let store = store.clone();
        let stats = stats.clone();
        let cancel = cancel.clone();
        let retry = config.retry;

        handles.push(tokio::spawn(async move {
            while let Ok(seed) = rx.recv().await {
                let dead_reason = dns_cache
                    .get(&seed.domain)
                    .filter(|v| v.is_dead_or_timeout())
                    .map(|v| match v {
                        crate::dns::Verdict::Dead { reason, .. } => SkipReason::from(reason),
                        crate::dns::Verdict::Timeout { .. } => SkipReason::DnsTimeout,
                        crate::dns::Verdict::Live { .. } => unreachable!(),
                    });

                let outcome = worker::process_seed(&seed, &transport, dead_reason, retry, &cancel).await;
                record_stats(&stats, &outcome.outcome);

                if let Err(e) = store.write(outcome) {
                    tracing::error!(error = %e, "failed to write outcome to result store");
                }
            }
        }));
    }

    let _ = feeder.await;
    for handle in handles {
        let _ = handle.await;
    }

    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "final result store flush failed");
    }
}

fn record_stats(stats: &Stats, outcome: &Outcome) {
    match outcome {
        Outcome::Ok { retries, .. } => {
            stats.record_ok();
            if *retries > 0 {
                stats.record_retry();
            }
        }
        Outcome::HttpError { retries, .. } => {
            stats.record_http_error();
            if *retries > 0 {
                stats.record_retry();
            }
        }
        Outcome::Timeout { retries } => {
            stats.record_timeout();
            if *retries > 0 {
                stats.record_retry();
            }
        }
        Outcome::ConnectFailed { retries, .. } => {
            stats.record_connect_failed();
            if *retries > 0 {
                stats.record_retry();
            }
        }
        Outcome::ReadFailed { retries, .. } => {
            stats.record_read_failed();
            if *retries > 0 {
                stats.record_retry();
            }
        }
        Outcome::DnsSkipped { .. } => stats.record_dns_skipped(),
        Outcome::Cancelled => stats.record_cancelled(),
    }
}

pub fn retry_policy_for_mode(mode: crate::transport::FetchMode, base_backoff: Duration) -> RetryPolicy {
    let max_retries = match mode {
        crate::transport::FetchMode::StatusOnly => 0,
        crate::transport::FetchMode::HeadOnly => 0,
        crate::transport::FetchMode::Full => 2,
    };
    RetryPolicy {
        max_retries,
        base_backoff,
    }
}
