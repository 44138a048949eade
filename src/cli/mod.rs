//! CLI surface (spec.md §6): `recrawl` and `verify`.

pub mod recrawl;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "recrawl", about = "High-throughput web recrawl pipeline over a columnar seed index")]
pub struct Cli {
    /// Path to a TOML config file; overridden by any matching CLI flag.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Check if verbose mode is enabled (for early logging setup, before
/// `Cli::parse()` has run).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute §4.1-4.6 end-to-end.
    Recrawl(recrawl::RecrawlArgs),
    /// Execute §4.7 over the failure ledger.
    Verify(verify::VerifyArgs),
}

/// Parse argv, load config, and dispatch. Returns the process exit code.
pub async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Recrawl(args) => recrawl::run(args, config).await,
        Command::Verify(args) => verify::run(args, config).await,
    }
}
