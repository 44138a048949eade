//! Thread-safe run counters + live display (C5).

mod display;

pub use display::{run_display, DisplayHandle};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Atomic counters updated by workers; read by the render thread on a
/// fixed interval. No mutation occurs on the render path (spec.md §4.5).
#[derive(Default)]
pub struct Stats {
    total: AtomicU64,
    done: AtomicU64,
    ok: AtomicU64,
    http_error: AtomicU64,
    timeout: AtomicU64,
    connect_failed: AtomicU64,
    read_failed: AtomicU64,
    dns_skipped: AtomicU64,
    cancelled: AtomicU64,
    retries: AtomicU64,
}

/// Immutable snapshot of [`Stats`] at one point in time.
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub total: u64,
    pub done: u64,
    pub ok: u64,
    pub http_error: u64,
    pub timeout: u64,
    pub connect_failed: u64,
    pub read_failed: u64,
    pub dns_skipped: u64,
    pub cancelled: u64,
    pub retries: u64,
    pub elapsed: Duration,
    pub rate_per_sec: f64,
    pub eta: Option<Duration>,
}

impl Stats {
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            ..Default::default()
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn record_ok(&self) {
        self.ok.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_error(&self) {
        self.http_error.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeout.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failed(&self) {
        self.connect_failed.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failed(&self) {
        self.read_failed.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dns_skipped(&self) {
        self.dns_skipped.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, started_at: Instant) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let done = self.done.load(Ordering::Relaxed);
        let elapsed = started_at.elapsed();
        let rate = done as f64 / elapsed.as_secs_f64().max(0.001);
        let eta = if rate > 0.0 && total > done {
            Some(Duration::from_secs_f64((total - done) as f64 / rate))
        } else {
            None
        };

        StatsSnapshot {
            total,
            done,
            ok: self.ok.load(Ordering::Relaxed),
            http_error: self.http_error.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
            connect_failed: self.connect_failed.load(Ordering::Relaxed),
            read_failed: self.read_failed.load(Ordering::Relaxed),
            dns_skipped: self.dns_skipped.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            elapsed,
            rate_per_sec: rate,
            eta,
        }
    }

    pub fn is_done(&self) -> bool {
        let total = self.total.load(Ordering::Relaxed);
        total > 0 && self.done.load(Ordering::Relaxed) >= total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_outcomes() {
        let stats = Stats::new(10);
        stats.record_ok();
        stats.record_http_error();
        stats.record_dns_skipped();
        let snap = stats.snapshot(Instant::now());
        assert_eq!(snap.done, 3);
        assert_eq!(snap.ok, 1);
        assert_eq!(snap.http_error, 1);
        assert_eq!(snap.dns_skipped, 1);
    }

    #[test]
    fn is_done_requires_total_set() {
        let stats = Stats::new(0);
        stats.record_ok();
        assert!(!stats.is_done());
        stats.set_total(1);
        assert!(stats.is_done());
    }
}
