//! Per-seed fetch-classify-retry logic run by each worker (spec.md §4.4
//! step 4).

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::seeds::Seed;
use crate::transport::Transport;

use super::outcome::{Outcome, SkipReason, UrlOutcome};

/// Per-fetch-mode retry policy (spec.md §4.4: "default 0 for status-only, 2
/// for full").
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

/// Process one seed: DNS-dead short-circuit, fetch with retry, classify.
/// Returns `None` only if cancelled before the fetch could start.
pub async fn process_seed(
    seed: &Seed,
    transport: &Transport,
    dns_dead_reason: Option<SkipReason>,
    retry: RetryPolicy,
    cancel: &CancellationToken,
) -> UrlOutcome {
    let now = chrono::Utc::now();

    if let Some(reason) = dns_dead_reason {
        return UrlOutcome {
            url: seed.url.clone(),
            domain: seed.domain.clone(),
            outcome: Outcome::DnsSkipped { reason },
            recorded_at: now,
        };
    }

    if cancel.is_cancelled() {
        return UrlOutcome {
            url: seed.url.clone(),
            domain: seed.domain.clone(),
            outcome: Outcome::Cancelled,
            recorded_at: now,
        };
    }

    let mut attempt = 0u32;
    loop {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return UrlOutcome {
                    url: seed.url.clone(),
                    domain: seed.domain.clone(),
                    outcome: Outcome::Cancelled,
                    recorded_at: chrono::Utc::now(),
                };
            }
            result = transport.fetch(&seed.domain, &seed.url) => result,
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = classify(result, attempt, latency_ms);

        if outcome.is_retryable() && attempt < retry.max_retries {
            tokio::select! {
                _ = tokio::time::sleep(retry.backoff_for(attempt)) => {}
                _ = cancel.cancelled() => {
                    return UrlOutcome {
                        url: seed.url.clone(),
                        domain: seed.domain.clone(),
                        outcome: Outcome::Cancelled,
                        recorded_at: chrono::Utc::now(),
                    };
                }
            }
            attempt += 1;
            continue;
        }

        return UrlOutcome {
            url: seed.url.clone(),
            domain: seed.domain.clone(),
            outcome,
            recorded_at: chrono::Utc::now(),
        };
    }
}

fn classify(result: Result<crate::transport::FetchedResponse, reqwest::Error>, retries: u32, latency_ms: u64) -> Outcome {
    match result {
        Ok(resp) if resp.status.as_u16() >= 400 => Outcome::HttpError {
            status: resp.status.as_u16(),
            content_type: resp.content_type,
            body_size: resp.body_size,
            truncated: resp.truncated,
            final_url: resp.final_url,
            latency_ms,
            retries,
        },
        Ok(resp) => Outcome::Ok {
            status: resp.status.as_u16(),
            content_type: resp.content_type,
            body_size: resp.body_size,
            truncated: resp.truncated,
            final_url: resp.final_url,
            latency_ms,
            retries,
        },
        Err(e) if e.is_timeout() => Outcome::Timeout { retries },
        Err(e) if e.is_connect() => Outcome::ConnectFailed {
            error: e.to_string(),
            retries,
        },
        // Connected and got a response, but reading the body (or decoding
        // it) failed — distinct from never connecting at all.
        Err(e) => Outcome::ReadFailed {
            error: e.to_string(),
            retries,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }
}
