//! Batched DNS pre-resolution over the persistent cache (C2).

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, Resolver, TokioResolver};
use tokio::sync::Semaphore;

use super::cache::DnsCache;
use super::verdict::{DeadReason, Verdict};
use crate::error::DnsError;

/// Snapshot emitted periodically while a batch resolve is in flight.
#[derive(Debug, Clone, Copy)]
pub struct ResolveProgress {
    pub done: usize,
    pub total: usize,
    pub live: usize,
    pub dead: usize,
    pub timeout: usize,
    pub speed_per_sec: f64,
    pub elapsed: Duration,
}

/// Tallies returned by a completed batch resolve.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchTally {
    pub live: usize,
    pub dead: usize,
    pub timeout: usize,
}

pub fn build_resolver(nameservers: &[SocketAddr], timeout: Duration) -> Result<TokioResolver, DnsError> {
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;

    let config = if nameservers.is_empty() {
        ResolverConfig::default()
    } else {
        let mut config = ResolverConfig::new();
        for addr in nameservers {
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
        }
        config
    };

    Ok(Resolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(opts)
        .build())
}

fn classify(err: &ResolveError) -> Verdict {
    use hickory_resolver::ResolveErrorKind;

    let now = chrono::Utc::now();
    let text = err.to_string();
    let lower = text.to_ascii_lowercase();

    match err.kind() {
        ResolveErrorKind::Proto(_) if lower.contains("timed out") || lower.contains("timeout") => {
            Verdict::Timeout {
                error: text,
                observed_at: now,
            }
        }
        _ if lower.contains("no such host")
            || lower.contains("nxdomain")
            || lower.contains("no records found") =>
        {
            Verdict::Dead {
                reason: DeadReason::Nxdomain,
                error: text,
                observed_at: now,
            }
        }
        _ if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") => {
            Verdict::Timeout {
                error: text,
                observed_at: now,
            }
        }
        _ => Verdict::Dead {
            reason: DeadReason::Other,
            error: text,
            observed_at: now,
        },
    }
}

/// Resolve every domain in `domains` that isn't already in `cache`, with up
/// to `workers` concurrent lookups, each bounded by `timeout`.
pub async fn resolve_batch(
    cache: &DnsCache,
    domains: Vec<String>,
    resolver: Arc<TokioResolver>,
    workers: usize,
    timeout: Duration,
    mut on_progress: impl FnMut(ResolveProgress) + Send + 'static,
) -> BatchTally {
    let pending: Vec<String> = domains.into_iter().filter(|d| !cache.contains(d)).collect();
    let total = pending.len();

    let live = Arc::new(AtomicU64::new(0));
    let dead = Arc::new(AtomicU64::new(0));
    let timed_out = Arc::new(AtomicU64::new(0));
    let done = Arc::new(AtomicU64::new(0));
    let started_at = Instant::now();

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    let mut handles = Vec::with_capacity(total);
    for domain in pending {
        let permit = semaphore.clone();
        let resolver = resolver.clone();
        let cache_entries = (live.clone(), dead.clone(), timed_out.clone(), done.clone());
        let progress_tx = progress_tx.clone();

        let domain_for_cache = domain.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore closed");
            let verdict = resolve_one(&resolver, &domain, timeout).await;

            let (live, dead, timed_out, done) = cache_entries;
            match &verdict {
                Verdict::Live { .. } => {
                    live.fetch_add(1, Ordering::Relaxed);
                }
                Verdict::Dead { .. } => {
                    dead.fetch_add(1, Ordering::Relaxed);
                }
                Verdict::Timeout { .. } => {
                    timed_out.fetch_add(1, Ordering::Relaxed);
                }
            }
            done.fetch_add(1, Ordering::Relaxed);
            let _ = progress_tx.send(());

            (domain_for_cache, verdict)
        });
        handles.push(handle);
    }
    drop(progress_tx);

    // Periodic progress reporter: fires on a fixed interval while results
    // trickle in, rather than once per completed domain (avoids flooding
    // the render path under 50k-wide fan-out).
    let report_done = done.clone();
    let report_live = live.clone();
    let report_dead = dead.clone();
    let report_timeout = timed_out.clone();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                recv = progress_rx.recv() => {
                    if recv.is_none() {
                        break;
                    }
                    continue;
                }
            }
            let done_n = report_done.load(Ordering::Relaxed) as usize;
            let elapsed = started_at.elapsed();
            on_progress(ResolveProgress {
                done: done_n,
                total,
                live: report_live.load(Ordering::Relaxed) as usize,
                dead: report_dead.load(Ordering::Relaxed) as usize,
                timeout: report_timeout.load(Ordering::Relaxed) as usize,
                speed_per_sec: done_n as f64 / elapsed.as_secs_f64().max(0.001),
                elapsed,
            });
            if done_n >= total {
                break;
            }
        }
    });

    for handle in handles {
        if let Ok((domain, verdict)) = handle.await {
            cache.insert_if_absent(domain, verdict);
        }
    }
    let _ = reporter.await;

    BatchTally {
        live: live.load(Ordering::Relaxed) as usize,
        dead: dead.load(Ordering::Relaxed) as usize,
        timeout: timed_out.load(Ordering::Relaxed) as usize,
    }
}

async fn resolve_one(resolver: &TokioResolver, domain: &str, per_lookup_timeout: Duration) -> Verdict {
    match tokio::time::timeout(per_lookup_timeout, resolver.lookup_ip(domain)).await {
        Ok(Ok(lookup)) => {
            let ips: Vec<String> = lookup.iter().map(|ip: IpAddr| ip.to_string()).collect();
            if ips.is_empty() {
                Verdict::Dead {
                    reason: DeadReason::NoHost,
                    error: "resolved zero addresses".into(),
                    observed_at: chrono::Utc::now(),
                }
            } else {
                Verdict::Live {
                    ips,
                    resolved_at: chrono::Utc::now(),
                }
            }
        }
        Ok(Err(e)) => classify(&e),
        Err(_elapsed) => Verdict::Timeout {
            error: "deadline exceeded".into(),
            observed_at: chrono::Utc::now(),
        },
    }
}
