//! Per-URL outcome: a tagged classification of a single fetch attempt,
//! persisted to the result store (spec.md GLOSSARY, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dns::DeadReason;

/// Why a URL was never attempted, or why an attempt didn't complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    DnsNxdomain,
    DnsTimeout,
    DnsOther,
}

impl From<DeadReason> for SkipReason {
    fn from(reason: DeadReason) -> Self {
        match reason {
            DeadReason::Nxdomain => SkipReason::DnsNxdomain,
            DeadReason::NoHost => SkipReason::DnsNxdomain,
            DeadReason::HttpDead | DeadReason::Other => SkipReason::DnsOther,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::DnsNxdomain => "dns_nxdomain",
            SkipReason::DnsTimeout => "dns_timeout",
            SkipReason::DnsOther => "dns_other",
        };
        f.write_str(s)
    }
}

/// The tagged classification of a completed (or deliberately skipped)
/// fetch attempt (spec.md §3: `outcome ∈ {ok, http_error, dns_skipped,
/// connect_failed, timeout, read_failed, cancelled}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome_tag", rename_all = "snake_case")]
pub enum Outcome {
    /// Completed HTTP transaction with a 2xx/3xx status.
    Ok {
        status: u16,
        content_type: Option<String>,
        body_size: usize,
        truncated: bool,
        final_url: String,
        latency_ms: u64,
        retries: u32,
    },
    /// Completed HTTP transaction with a 4xx/5xx status.
    HttpError {
        status: u16,
        content_type: Option<String>,
        body_size: usize,
        truncated: bool,
        final_url: String,
        latency_ms: u64,
        retries: u32,
    },
    Timeout {
        retries: u32,
    },
    ConnectFailed {
        error: String,
        retries: u32,
    },
    /// Connected and received a response, but failed reading the body.
    ReadFailed {
        error: String,
        retries: u32,
    },
    DnsSkipped {
        reason: SkipReason,
    },
    Cancelled,
}

impl Outcome {
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Ok { .. } => "ok",
            Outcome::HttpError { .. } => "http_error",
            Outcome::Timeout { .. } => "timeout",
            Outcome::ConnectFailed { .. } => "connect_failed",
            Outcome::ReadFailed { .. } => "read_failed",
            Outcome::DnsSkipped { .. } => "dns_skipped",
            Outcome::Cancelled => "cancelled",
        }
    }

    /// Transient failures eligible for retry (spec.md §4.4): timeouts,
    /// connect failures, read failures, and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::Timeout { .. } | Outcome::ConnectFailed { .. } | Outcome::ReadFailed { .. }
        ) || matches!(self, Outcome::HttpError { status, .. } if *status >= 500)
    }
}

/// One row in the result store: a seed's URL paired with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlOutcome {
    pub url: String,
    pub domain: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}
