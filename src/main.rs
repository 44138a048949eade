//! recrawl - high-throughput web recrawl pipeline over a columnar seed index.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_filter = if recrawl::cli::is_verbose() {
        "recrawl=info"
    } else {
        "recrawl=warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    raise_fd_limit();

    let code = recrawl::cli::run().await?;
    std::process::exit(code);
}

/// Workers default to 50,000 (spec.md §4), each potentially holding an
/// in-flight socket behind the per-domain semaphore and shard connection
/// pools — raise the process's open-file soft limit to the hard limit so a
/// default run doesn't start failing connects under `EMFILE`.
#[cfg(unix)]
fn raise_fd_limit() {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, appropriately sized out-param for getrlimit.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        tracing::warn!("failed to read RLIMIT_NOFILE, leaving file descriptor limit unchanged");
        return;
    }

    if limit.rlim_cur >= limit.rlim_max {
        return;
    }

    let raised = libc::rlimit {
        rlim_cur: limit.rlim_max,
        rlim_max: limit.rlim_max,
    };
    // SAFETY: `raised` only widens the soft limit up to the existing hard limit.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &raised) } != 0 {
        tracing::warn!("failed to raise RLIMIT_NOFILE");
    } else {
        tracing::debug!(soft = raised.rlim_cur, "raised open file descriptor limit");
    }
}

#[cfg(not(unix))]
fn raise_fd_limit() {}
