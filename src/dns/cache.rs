//! Persistent DNS cache (C2). Single-writer for mutation, snapshot reads.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use dashmap::DashMap;

use super::verdict::{CacheRecord, DeadReason, Verdict};
use crate::error::DnsError;

/// Cache of domain -> verdict, persisted as newline-delimited JSON.
///
/// Backed by a `DashMap` rather than a single `Mutex<HashMap>`: per spec.md
/// §9 the per-domain lookup is a hot path that wants lock-free reads and
/// CAS-on-miss inserts, which `DashMap`'s sharded-shard locking gives
/// without a single global writer lock.
#[derive(Debug, Default)]
pub struct DnsCache {
    entries: DashMap<String, Verdict>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Load prior verdicts from `path`. Idempotent; an absent file yields an
    /// empty cache. A corrupt file also yields an empty cache, with a
    /// warning, rather than failing the run (spec.md §6).
    pub fn load(path: &Path) -> Result<(Self, usize), DnsError> {
        let cache = Self::new();
        if !path.exists() {
            return Ok((cache, 0));
        }

        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to open DNS cache, starting empty");
                return Ok((cache, 0));
            }
        };

        let mut count = 0;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(error = %e, lineno, "DNS cache read error, stopping load");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CacheRecord>(&line) {
                Ok(record) => {
                    cache.entries.insert(record.domain, record.verdict);
                    count += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, lineno, "skipping corrupt DNS cache record");
                }
            }
        }

        Ok((cache, count))
    }

    /// Atomically replace the cache file with the current contents.
    pub fn save(&self, path: &Path) -> Result<(), DnsError> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            for entry in self.entries.iter() {
                let record = CacheRecord {
                    domain: entry.key().clone(),
                    verdict: entry.value().clone(),
                };
                let line = serde_json::to_string(&record)?;
                writeln!(file, "{line}")?;
            }
            file.flush()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn get(&self, domain: &str) -> Option<Verdict> {
        self.entries.get(domain).map(|v| v.value().clone())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.entries.contains_key(domain)
    }

    /// Insert a verdict if this domain has no verdict yet. Never downgrades
    /// an existing verdict (spec.md §3 monotonicity invariant).
    pub fn insert_if_absent(&self, domain: String, verdict: Verdict) {
        self.entries.entry(domain).or_insert(verdict);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dead(&self, domain: &str) -> bool {
        matches!(self.get(domain), Some(v) if v.is_dead_or_timeout())
    }

    pub fn resolved_ips(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .filter_map(|e| match e.value() {
                Verdict::Live { ips, .. } => Some((e.key().clone(), ips.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn dead_domains_with_errors(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|e| match e.value() {
                Verdict::Dead { error, .. } => Some((e.key().clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn timeout_domains_with_errors(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|e| match e.value() {
                Verdict::Timeout { error, .. } => Some((e.key().clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn dead_or_timeout_with_reasons(&self) -> Vec<(String, DeadReason, String)> {
        self.entries
            .iter()
            .filter_map(|e| match e.value() {
                Verdict::Dead { reason, error, .. } => Some((e.key().clone(), *reason, error.clone())),
                Verdict::Timeout { error, .. } => {
                    Some((e.key().clone(), DeadReason::Other, error.clone()))
                }
                _ => None,
            })
            .collect()
    }
}
