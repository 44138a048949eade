//! DNS verdict: the tagged classification persisted per domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadReason {
    Nxdomain,
    NoHost,
    HttpDead,
    Other,
}

impl std::fmt::Display for DeadReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeadReason::Nxdomain => "nxdomain",
            DeadReason::NoHost => "no_host",
            DeadReason::HttpDead => "http_dead",
            DeadReason::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict_tag", rename_all = "snake_case")]
pub enum Verdict {
    Live {
        ips: Vec<String>,
        resolved_at: DateTime<Utc>,
    },
    Dead {
        reason: DeadReason,
        error: String,
        observed_at: DateTime<Utc>,
    },
    Timeout {
        error: String,
        observed_at: DateTime<Utc>,
    },
}

impl Verdict {
    pub fn is_dead_or_timeout(&self) -> bool {
        !matches!(self, Verdict::Live { .. })
    }

    pub fn ips(&self) -> &[String] {
        match self {
            Verdict::Live { ips, .. } => ips,
            _ => &[],
        }
    }
}

/// A single cached verdict, as persisted in the cache file: one record per
/// domain round-tripping exactly (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub domain: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}
