//! `recrawl` subcommand: execute §4.1–4.6 end-to-end.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dns::DnsService;
use crate::engine::{self, EngineConfig};
use crate::ledger::{self, FailureLedger};
use crate::seeds::{self, SeedFilter, SeedSource};
use crate::stats::{run_display, Stats};
use crate::store::ResultStore;
use crate::transport::{FetchMode, Transport};

#[derive(Debug, Args)]
pub struct RecrawlArgs {
    /// Take the most recently seen N matching rows.
    #[arg(long, conflicts_with_all = ["file", "sample"])]
    pub last: Option<usize>,

    /// A row count against the default index path, or an explicit parquet path.
    #[arg(long, conflicts_with_all = ["last", "sample"])]
    pub file: Option<String>,

    /// Take a random sample of N matching rows.
    #[arg(long, conflicts_with_all = ["last", "file"])]
    pub sample: Option<usize>,

    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub dns_workers: Option<usize>,
    #[arg(long)]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub dns_timeout: Option<u64>,

    #[arg(long)]
    pub status_only: bool,
    #[arg(long)]
    pub head_only: bool,

    #[arg(long)]
    pub transport_shards: Option<usize>,
    #[arg(long)]
    pub max_conns_per_domain: Option<usize>,
    #[arg(long)]
    pub dns_prefetch: bool,
    #[arg(long)]
    pub resume: bool,

    #[arg(long)]
    pub lang: Vec<String>,
    #[arg(long)]
    pub mime: Vec<String>,
    #[arg(long)]
    pub status: Vec<i32>,
    #[arg(long)]
    pub domain: Vec<String>,
    #[arg(long)]
    pub tld: Vec<String>,
    #[arg(long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output directory for the result store, DNS cache, and failure ledger.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

fn to_set<T: std::hash::Hash + Eq + Clone>(v: &[T]) -> Option<HashSet<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v.iter().cloned().collect())
    }
}

pub async fn run(args: RecrawlArgs, mut config: Config) -> anyhow::Result<i32> {
    if let Some(out) = &args.out {
        config.output_dir = Some(out.clone());
    }
    let workers = args.workers.unwrap_or(config.workers);
    let dns_workers = args.dns_workers.unwrap_or(config.dns_workers);
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.timeout_secs));
    let dns_timeout = Duration::from_secs(args.dns_timeout.unwrap_or(config.dns_timeout_secs));
    let transport_shards = args.transport_shards.unwrap_or(config.transport_shards);
    let max_conns_per_domain = args.max_conns_per_domain.unwrap_or(config.max_conns_per_domain);
    let batch_size = args.batch_size.unwrap_or(config.batch_size);

    let fetch_mode = if args.status_only {
        FetchMode::StatusOnly
    } else if args.head_only {
        FetchMode::HeadOnly
    } else {
        FetchMode::Full
    };
    let max_body_bytes = match fetch_mode {
        FetchMode::StatusOnly => config.status_only_body_cap,
        FetchMode::HeadOnly => 0,
        FetchMode::Full => config.max_body_bytes,
    };

    let filter = SeedFilter {
        statuses: to_set(&args.status),
        mimes: to_set(&args.mime),
        languages: to_set(&args.lang),
        domains: to_set(&args.domain),
        tlds: to_set(&args.tld),
        limit: args.limit,
    };

    // `--file` is overloaded (spec.md §6): a bare row count selects that
    // many rows from the default index path, anything else is a literal
    // path to read instead.
    let mut file_row_limit: Option<usize> = None;
    let source_path = match &args.file {
        Some(value) => match value.parse::<usize>() {
            Ok(n) => {
                file_row_limit = Some(n);
                PathBuf::from("index.parquet")
            }
            Err(_) => PathBuf::from(value),
        },
        None => PathBuf::from("index.parquet"),
    };
    let source = SeedSource::File(source_path);

    let extracted = seeds::extract(&source, &filter)?;
    let mut seed_list = extracted.seeds;

    if let Some(n) = file_row_limit {
        seed_list.truncate(n);
    }

    if let Some(n) = args.sample {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        seed_list.sort_by_key(|s| {
            let mut h = DefaultHasher::new();
            s.url.hash(&mut h);
            h.finish()
        });
        seed_list.truncate(n);
    } else if let Some(n) = args.last {
        if seed_list.len() > n {
            let start = seed_list.len() - n;
            seed_list = seed_list.split_off(start);
        }
    }

    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)?;

    let skip_set = if args.resume {
        Arc::new(ResultStore::load_already_processed(&output_dir)?)
    } else {
        Arc::new(HashSet::new())
    };

    let dns_cache_path = config.dns_cache_path();
    let (dns_service, _loaded) = DnsService::load_cache(&dns_cache_path)?;
    let dns_service = Arc::new(dns_service);

    if args.dns_prefetch {
        let domains: Vec<String> = {
            let mut set: HashSet<&str> = HashSet::new();
            seed_list.iter().map(|s| s.domain.as_str()).for_each(|d| {
                set.insert(d);
            });
            set.into_iter().map(String::from).collect()
        };

        let nameservers: Vec<SocketAddr> = Vec::new();
        let tally = dns_service
            .resolve_batch(domains, dns_workers, dns_timeout, &nameservers, move |p| {
                tracing::info!(done = p.done, total = p.total, live = p.live, dead = p.dead, timeout = p.timeout, "dns prefetch progress");
            })
            .await?;
        tracing::info!(live = tally.live, dead = tally.dead, timeout = tally.timeout, "dns prefetch complete");
        dns_service.save_cache(&dns_cache_path)?;
    }

    let cache = dns_service.cache();

    let mut domain_url_counts: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
    for s in &seed_list {
        *domain_url_counts.entry(s.domain.clone()).or_insert(0) += 1;
    }

    let stats = Arc::new(Stats::new(seed_list.len() as u64));
    let store = Arc::new(ResultStore::open(&output_dir, config.result_shards, batch_size)?);
    store.set_meta("workers", &workers.to_string());
    store.set_meta("mode", &format!("{fetch_mode:?}"));
    store.set_meta("start_time", &chrono::Utc::now().to_rfc3339());

    let transport = Arc::new(Transport::new(
        transport_shards,
        max_conns_per_domain,
        cache.clone(),
        timeout,
        &config.user_agent,
        max_body_bytes,
        fetch_mode,
    )?);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c_cancel.cancel();
    });

    let started_at = std::time::Instant::now();
    let display = run_display(stats.clone(), "recrawl", Duration::from_millis(200));

    let retry = engine::retry_policy_for_mode(fetch_mode, Duration::from_millis(250));
    engine::run(
        seed_list,
        skip_set,
        stats.clone(),
        transport,
        cache.clone(),
        store.clone(),
        cancel.clone(),
        EngineConfig { workers, retry },
    )
    .await;

    display.stop().await;
    store.set_meta("finish_time", &chrono::Utc::now().to_rfc3339());
    store.flush()?;
    dns_service.save_cache(&dns_cache_path)?;

    let failure_ledger = FailureLedger::open(&output_dir.join("failed.jsonl"))?;
    for failure in ledger::failures_from_cache(cache.dead_or_timeout_with_reasons(), &domain_url_counts) {
        failure_ledger.record(failure)?;
    }
    let written_outcomes = ResultStore::read_all_outcomes(&output_dir)?;
    for failure in ledger::failures_from_outcomes(&written_outcomes) {
        failure_ledger.record(failure)?;
    }

    let snap = stats.snapshot(started_at);
    tracing::info!(
        done = snap.done,
        ok = snap.ok,
        dns_skipped = snap.dns_skipped,
        timeout = snap.timeout,
        connect_failed = snap.connect_failed,
        "recrawl run complete, output at {}",
        output_dir.display()
    );

    // Cancellation is a clean exit (spec.md §6): only unexpected failures,
    // which surface as `Err` above, produce a non-zero code.
    Ok(0)
}
