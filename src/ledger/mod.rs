//! Failure ledger (C7): single-writer append store with cached O(1)
//! summary counters.

pub mod verifier;

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::dns::DeadReason;
use crate::engine::{Outcome, UrlOutcome};
use crate::error::LedgerError;

/// One row of the ledger's `domains` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFailure {
    pub domain: String,
    pub reason: DeadReason,
    pub error: String,
    pub url_count: u64,
    pub stage: FailureStage,
}

/// Ordered so `Fetch > Dns` (spec.md §3: "readers take the latest by stage
/// precedence fetch > dns_batch"); derive order must match declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FailureStage {
    Dns,
    Fetch,
}

/// Single-writer append store over `failed.jsonl`, with cached counters so
/// `domain_count()` / `url_count()` are O(1) (spec.md §4.7).
pub struct FailureLedger {
    path: PathBuf,
    file: Mutex<std::fs::File>,
    domain_count: AtomicU64,
    url_count: AtomicU64,
}

impl FailureLedger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let (domain_count, url_count) = count_existing(path)?;
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            domain_count: AtomicU64::new(domain_count),
            url_count: AtomicU64::new(url_count),
        })
    }

    pub fn record(&self, failure: DomainFailure) -> Result<(), LedgerError> {
        let line = serde_json::to_string(&failure)?;
        let mut file = self.file.lock().expect("ledger file poisoned");
        writeln!(file, "{line}")?;
        file.flush()?;
        drop(file);

        self.domain_count.fetch_add(1, Ordering::Relaxed);
        self.url_count.fetch_add(failure.url_count, Ordering::Relaxed);
        Ok(())
    }

    pub fn domain_count(&self) -> u64 {
        self.domain_count.load(Ordering::Relaxed)
    }

    pub fn url_count(&self) -> u64 {
        self.url_count.load(Ordering::Relaxed)
    }

    /// Every recorded failure, deduped to one row per domain (stage
    /// precedence `fetch > dns_batch`, latest wins within a stage), ordered
    /// by URL count descending — the order the verifier consumes them in
    /// (spec.md §4.7).
    pub fn failures_by_url_count_desc(&self) -> Result<Vec<DomainFailure>, LedgerError> {
        let rows = read_all(&self.path)?;
        let mut by_domain: HashMap<String, DomainFailure> = HashMap::new();
        for row in rows {
            match by_domain.get(&row.domain) {
                Some(existing) if row.stage < existing.stage => {}
                _ => {
                    by_domain.insert(row.domain.clone(), row);
                }
            }
        }
        let mut deduped: Vec<DomainFailure> = by_domain.into_values().collect();
        deduped.sort_by(|a, b| b.url_count.cmp(&a.url_count));
        Ok(deduped)
    }
}

fn count_existing(path: &Path) -> Result<(u64, u64), LedgerError> {
    let rows = read_all(path)?;
    let domains: u64 = rows.len() as u64;
    let urls: u64 = rows.iter().map(|r| r.url_count).sum();
    Ok((domains, urls))
}

fn read_all(path: &Path) -> Result<Vec<DomainFailure>, LedgerError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DomainFailure>(&line) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(error = %e, "skipping corrupt ledger record"),
        }
    }
    Ok(rows)
}

/// Derive a `domains` table from a completed run's dead/timeout verdicts and
/// per-URL outcome counts, grouping URL counts by domain.
pub fn failures_from_cache(
    dead_or_timeout: Vec<(String, DeadReason, String)>,
    url_counts: &HashMap<String, u64>,
) -> Vec<DomainFailure> {
    dead_or_timeout
        .into_iter()
        .map(|(domain, reason, error)| {
            let url_count = url_counts.get(&domain).copied().unwrap_or(0);
            DomainFailure {
                domain,
                reason,
                error,
                url_count,
                stage: FailureStage::Dns,
            }
        })
        .collect()
}

/// Derive `Fetch`-stage rows from a completed run's written outcomes: one
/// row per domain that failed at the HTTP layer (timeout, connect, read, or
/// error status) on at least half of its attempted URLs. The DNS-stage
/// counterpart to `failures_from_cache` (spec.md §2 C7, §3 `stage: fetch`).
pub fn failures_from_outcomes(rows: &[UrlOutcome]) -> Vec<DomainFailure> {
    struct Tally {
        attempted: u64,
        failed: u64,
        last_error: String,
    }

    let mut per_domain: HashMap<String, Tally> = HashMap::new();
    for row in rows {
        let (failed, error) = match &row.outcome {
            Outcome::Ok { .. } => (false, None),
            Outcome::HttpError { status, .. } => (true, Some(format!("http status {status}"))),
            Outcome::Timeout { .. } => (true, Some("request timed out".to_string())),
            Outcome::ConnectFailed { error, .. } => (true, Some(error.clone())),
            Outcome::ReadFailed { error, .. } => (true, Some(error.clone())),
            Outcome::DnsSkipped { .. } | Outcome::Cancelled => continue,
        };

        let tally = per_domain.entry(row.domain.clone()).or_insert(Tally {
            attempted: 0,
            failed: 0,
            last_error: String::new(),
        });
        tally.attempted += 1;
        if failed {
            tally.failed += 1;
            if let Some(error) = error {
                tally.last_error = error;
            }
        }
    }

    per_domain
        .into_iter()
        .filter(|(_, t)| t.failed * 2 >= t.attempted)
        .map(|(domain, t)| DomainFailure {
            domain,
            reason: DeadReason::HttpDead,
            error: t.last_error,
            url_count: t.attempted,
            stage: FailureStage::Fetch,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_update_after_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::open(&dir.path().join("failed.jsonl")).unwrap();

        ledger
            .record(DomainFailure {
                domain: "dead.example".into(),
                reason: DeadReason::Nxdomain,
                error: "no such host".into(),
                url_count: 5,
                stage: FailureStage::Dns,
            })
            .unwrap();

        assert_eq!(ledger.domain_count(), 1);
        assert_eq!(ledger.url_count(), 5);
    }

    #[test]
    fn reopening_recovers_cached_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.jsonl");
        {
            let ledger = FailureLedger::open(&path).unwrap();
            ledger
                .record(DomainFailure {
                    domain: "dead.example".into(),
                    reason: DeadReason::Nxdomain,
                    error: "no such host".into(),
                    url_count: 3,
                    stage: FailureStage::Dns,
                })
                .unwrap();
        }
        let reopened = FailureLedger::open(&path).unwrap();
        assert_eq!(reopened.domain_count(), 1);
        assert_eq!(reopened.url_count(), 3);
    }

    #[test]
    fn failures_ordered_by_url_count_descending() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::open(&dir.path().join("failed.jsonl")).unwrap();
        for (domain, count) in [("a.example", 1), ("b.example", 9), ("c.example", 4)] {
            ledger
                .record(DomainFailure {
                    domain: domain.into(),
                    reason: DeadReason::Other,
                    error: "x".into(),
                    url_count: count,
                    stage: FailureStage::Dns,
                })
                .unwrap();
        }
        let ordered = ledger.failures_by_url_count_desc().unwrap();
        let domains: Vec<&str> = ordered.iter().map(|f| f.domain.as_str()).collect();
        assert_eq!(domains, vec!["b.example", "c.example", "a.example"]);
    }

    #[test]
    fn fetch_stage_row_wins_over_dns_stage_for_same_domain() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::open(&dir.path().join("failed.jsonl")).unwrap();
        ledger
            .record(DomainFailure {
                domain: "flaky.example".into(),
                reason: DeadReason::Other,
                error: "dns timeout".into(),
                url_count: 2,
                stage: FailureStage::Dns,
            })
            .unwrap();
        ledger
            .record(DomainFailure {
                domain: "flaky.example".into(),
                reason: DeadReason::HttpDead,
                error: "http status 503".into(),
                url_count: 7,
                stage: FailureStage::Fetch,
            })
            .unwrap();

        let deduped = ledger.failures_by_url_count_desc().unwrap();
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].stage, FailureStage::Fetch);
        assert_eq!(deduped[0].url_count, 7);
    }

    fn url_outcome(domain: &str, outcome: Outcome) -> UrlOutcome {
        UrlOutcome {
            url: format!("https://{domain}/"),
            domain: domain.into(),
            outcome,
            recorded_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn domain_failing_majority_of_fetches_becomes_a_fetch_stage_row() {
        let rows = vec![
            url_outcome(
                "mostly-down.example",
                Outcome::HttpError {
                    status: 503,
                    content_type: None,
                    body_size: 0,
                    truncated: false,
                    final_url: "https://mostly-down.example/".into(),
                    latency_ms: 5,
                    retries: 0,
                },
            ),
            url_outcome("mostly-down.example", Outcome::Timeout { retries: 0 }),
            url_outcome(
                "mostly-down.example",
                Outcome::Ok {
                    status: 200,
                    content_type: None,
                    body_size: 0,
                    truncated: false,
                    final_url: "https://mostly-down.example/".into(),
                    latency_ms: 5,
                    retries: 0,
                },
            ),
            url_outcome(
                "healthy.example",
                Outcome::Ok {
                    status: 200,
                    content_type: None,
                    body_size: 0,
                    truncated: false,
                    final_url: "https://healthy.example/".into(),
                    latency_ms: 5,
                    retries: 0,
                },
            ),
        ];

        let failures = failures_from_outcomes(&rows);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].domain, "mostly-down.example");
        assert_eq!(failures[0].stage, FailureStage::Fetch);
        assert_eq!(failures[0].url_count, 3);
    }
}
