//! `verify` subcommand: execute §4.7 over the failure ledger.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::config::Config;
use crate::ledger::verifier::{verify, VerifyConfig};
use crate::ledger::FailureLedger;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub dns_timeout: Option<u64>,
    #[arg(long)]
    pub http_timeout: Option<u64>,
    #[arg(long)]
    pub limit: Option<usize>,

    /// Run directory holding `failed.jsonl`; `verified.jsonl` is written
    /// alongside it.
    #[arg(long)]
    pub run_dir: Option<PathBuf>,
}

pub async fn run(args: VerifyArgs, config: Config) -> anyhow::Result<i32> {
    let run_dir = args.run_dir.unwrap_or_else(|| config.output_dir());
    let failed_path = run_dir.join("failed.jsonl");
    let out_path = run_dir.join("verified.jsonl");

    let ledger = FailureLedger::open(&failed_path)?;
    let failures = ledger.failures_by_url_count_desc()?;

    let cfg = VerifyConfig {
        workers: args.workers.unwrap_or(config.verify_workers),
        dns_timeout: Duration::from_secs(args.dns_timeout.unwrap_or(config.verify_dns_timeout_secs)),
        http_timeout: Duration::from_secs(args.http_timeout.unwrap_or(config.verify_http_timeout_secs)),
        limit: args.limit,
    };

    let summary = verify(failures, &out_path, cfg, |p| {
        tracing::info!(done = p.done, total = p.total, "verify progress");
    })
    .await?;

    tracing::info!(
        total = summary.total,
        alive = summary.alive,
        dead = summary.dead,
        false_positive_rate = summary.false_positive_rate,
        "verify complete, output at {}",
        out_path.display()
    );

    Ok(0)
}
