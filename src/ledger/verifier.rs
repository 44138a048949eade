//! Domain alive/dead re-verification against independent resolvers and
//! direct HTTP probes (spec.md §4.7). Used to measure the crawl's DNS
//! false-positive rate.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dns::build_resolver;
use crate::error::LedgerError;

use super::DomainFailure;

const GOOGLE_DNS: &str = "8.8.8.8:53";
const CLOUDFLARE_DNS: &str = "1.1.1.1:53";

#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    pub workers: usize,
    pub dns_timeout: Duration,
    pub http_timeout: Duration,
    pub limit: Option<usize>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            dns_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(30),
            limit: None,
        }
    }
}

/// One verified record, written to `verified.jsonl` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedDomain {
    pub domain: String,
    pub verdict: VerifyVerdict,
    pub dns_system_ips: String,
    pub dns_google_ips: String,
    pub dns_cloudflare_ips: String,
    pub http_status: Option<u16>,
    pub https_status: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyVerdict {
    Alive,
    Dead,
}

/// Summary over a completed verification pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VerifySummary {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
    pub false_positive_rate: f64,
}

/// Progress callback payload, mirroring the DNS batch reporter's shape.
#[derive(Debug, Clone, Copy)]
pub struct VerifyProgress {
    pub done: usize,
    pub total: usize,
}

/// Re-verify every domain in `failures`, most URL-affected first, up to
/// `cfg.limit`. Writes one record per domain to `out_path` and returns the
/// summary.
pub async fn verify(
    failures: Vec<DomainFailure>,
    out_path: &std::path::Path,
    cfg: VerifyConfig,
    mut on_progress: impl FnMut(VerifyProgress) + Send + 'static,
) -> Result<VerifySummary, LedgerError> {
    let mut ordered = failures;
    ordered.sort_by(|a, b| b.url_count.cmp(&a.url_count));
    if let Some(limit) = cfg.limit {
        ordered.truncate(limit);
    }
    let total = ordered.len();

    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(cfg.workers.max(1)));
    let mut handles = Vec::with_capacity(total);
    for failure in ordered {
        let permit = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore closed");
            verify_one(&failure.domain, cfg).await
        }));
    }

    let mut results = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        if let Ok(record) = handle.await {
            results.push(record);
        }
        on_progress(VerifyProgress { done: i + 1, total });
    }

    write_records(out_path, &results)?;

    let alive = results.iter().filter(|r| r.verdict == VerifyVerdict::Alive).count();
    let dead = results.len() - alive;
    let false_positive_rate = if results.is_empty() {
        0.0
    } else {
        alive as f64 / results.len() as f64
    };

    Ok(VerifySummary {
        total: results.len(),
        alive,
        dead,
        false_positive_rate,
    })
}

async fn verify_one(domain: &str, cfg: VerifyConfig) -> VerifiedDomain {
    let system_ips = resolve_via(domain, &[], cfg.dns_timeout).await;
    let google_ips = resolve_via(domain, &[GOOGLE_DNS.parse().unwrap()], cfg.dns_timeout).await;
    let cloudflare_ips = resolve_via(domain, &[CLOUDFLARE_DNS.parse().unwrap()], cfg.dns_timeout).await;

    let http_status = probe_http(&format!("http://{domain}/"), cfg.http_timeout).await;
    let https_status = probe_http(&format!("https://{domain}/"), cfg.http_timeout).await;

    let any_dns_hit = !system_ips.is_empty() || !google_ips.is_empty() || !cloudflare_ips.is_empty();
    let any_http_hit = http_status.is_some() || https_status.is_some();

    let verdict = if any_dns_hit || any_http_hit {
        VerifyVerdict::Alive
    } else {
        VerifyVerdict::Dead
    };

    VerifiedDomain {
        domain: domain.to_string(),
        verdict,
        dns_system_ips: system_ips.join(","),
        dns_google_ips: google_ips.join(","),
        dns_cloudflare_ips: cloudflare_ips.join(","),
        http_status,
        https_status,
    }
}

async fn resolve_via(domain: &str, nameservers: &[SocketAddr], timeout: Duration) -> Vec<String> {
    let resolver = match build_resolver(nameservers, timeout) {
        Ok(r) => r,
        Err(_) => return Vec::new(),
    };
    match tokio::time::timeout(timeout, resolver.lookup_ip(domain)).await {
        Ok(Ok(lookup)) => lookup.iter().map(|ip: IpAddr| ip.to_string()).collect(),
        _ => Vec::new(),
    }
}

async fn probe_http(url: &str, timeout: Duration) -> Option<u16> {
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    client.get(url).send().await.ok().map(|r| r.status().as_u16())
}

fn write_records(path: &std::path::Path, records: &[VerifiedDomain]) -> Result<(), LedgerError> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    for record in records {
        writeln!(file, "{}", serde_json::to_string(record)?)?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_positive_rate_is_alive_over_total() {
        let summary = VerifySummary {
            total: 4,
            alive: 1,
            dead: 3,
            false_positive_rate: 0.25,
        };
        assert_eq!(summary.alive as f64 / summary.total as f64, summary.false_positive_rate);
    }
}
