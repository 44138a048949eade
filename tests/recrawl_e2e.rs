//! End-to-end scenarios against a local mock HTTP server and a
//! hand-seeded DNS cache standing in for live resolution.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recrawl::dns::{DeadReason, DnsCache, Verdict};
use recrawl::engine::{self, EngineConfig, Outcome, RetryPolicy};
use recrawl::seeds::Seed;
use recrawl::stats::Stats;
use recrawl::store::ResultStore;
use recrawl::transport::{FetchMode, Transport};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seed(url: &str, domain: &str) -> Seed {
    Seed {
        url: url.to_string(),
        domain: domain.to_string(),
        referer: None,
    }
}

async fn run_engine(
    seeds: Vec<Seed>,
    cache: Arc<DnsCache>,
    store_dir: &std::path::Path,
    mode: FetchMode,
    max_conns_per_domain: usize,
) -> Arc<ResultStore> {
    let transport = Arc::new(
        Transport::new(2, max_conns_per_domain, cache.clone(), Duration::from_secs(5), "recrawl-test/0.1", 4096, mode)
            .unwrap(),
    );
    let store = Arc::new(ResultStore::open(store_dir, 2, 10).unwrap());
    let stats = Arc::new(Stats::new(seeds.len() as u64));
    let cancel = CancellationToken::new();

    engine::run(
        seeds,
        Arc::new(HashSet::new()),
        stats,
        transport,
        cache,
        store.clone(),
        cancel,
        EngineConfig {
            workers: 4,
            retry: RetryPolicy {
                max_retries: 0,
                base_backoff: Duration::from_millis(1),
            },
        },
    )
    .await;

    store
}

#[tokio::test]
async fn mixed_dns_verdicts_skip_dead_and_timeout_domains() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    let port = mock_server.address().port();

    let cache = Arc::new(DnsCache::new());
    cache.insert_if_absent(
        "a.test".into(),
        Verdict::Live {
            ips: vec!["127.0.0.1".into()],
            resolved_at: Utc::now(),
        },
    );
    cache.insert_if_absent(
        "b.test".into(),
        Verdict::Dead {
            reason: DeadReason::Nxdomain,
            error: "no such host".into(),
            observed_at: Utc::now(),
        },
    );
    cache.insert_if_absent(
        "c.test".into(),
        Verdict::Timeout {
            error: "deadline exceeded".into(),
            observed_at: Utc::now(),
        },
    );

    let seeds = vec![
        seed(&format!("http://a.test:{port}/"), "a.test"),
        seed("http://b.test/", "b.test"),
        seed("http://c.test/", "c.test"),
    ];

    let dir = tempfile::tempdir().unwrap();
    let store = run_engine(seeds, cache, dir.path(), FetchMode::Full, 8).await;
    store.flush().unwrap();

    let rows = recrawl::store::read_shard_file(&dir.path().join("shard-000"))
        .unwrap()
        .into_iter()
        .chain(recrawl::store::read_shard_file(&dir.path().join("shard-001")).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        match row.domain.as_str() {
            "a.test" => assert!(matches!(row.outcome, Outcome::Ok { status: 200, .. })),
            "b.test" => assert!(matches!(
                row.outcome,
                Outcome::DnsSkipped {
                    reason: recrawl::engine::SkipReason::DnsNxdomain
                }
            )),
            "c.test" => assert!(matches!(
                row.outcome,
                Outcome::DnsSkipped {
                    reason: recrawl::engine::SkipReason::DnsTimeout
                }
            )),
            other => panic!("unexpected domain {other}"),
        }
    }
}

#[tokio::test]
async fn status_only_mode_caps_body_and_skips_redirect_follow() {
    let mock_server = MockServer::start().await;
    let big_body = vec![b'x'; 10 * 1024 * 1024];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(301).set_body_bytes(big_body))
        .mount(&mock_server)
        .await;
    let port = mock_server.address().port();

    let cache = Arc::new(DnsCache::new());
    cache.insert_if_absent(
        "redir.test".into(),
        Verdict::Live {
            ips: vec!["127.0.0.1".into()],
            resolved_at: Utc::now(),
        },
    );

    let seeds = vec![
        seed(&format!("http://redir.test:{port}/1"), "redir.test"),
        seed(&format!("http://redir.test:{port}/2"), "redir.test"),
        seed(&format!("http://redir.test:{port}/3"), "redir.test"),
    ];

    let dir = tempfile::tempdir().unwrap();
    let store = run_engine(seeds, cache, dir.path(), FetchMode::StatusOnly, 2).await;
    store.flush().unwrap();

    let rows: Vec<_> = (0..2)
        .flat_map(|i| recrawl::store::read_shard_file(&dir.path().join(format!("shard-{i:03}"))).unwrap())
        .collect();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        match &row.outcome {
            Outcome::Ok { status, body_size, .. } => {
                assert_eq!(*status, 301);
                assert!(*body_size <= 4096);
            }
            other => panic!("expected ok outcome, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn resume_skips_already_processed_urls() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    let port = mock_server.address().port();

    let cache = Arc::new(DnsCache::new());
    cache.insert_if_absent(
        "r.test".into(),
        Verdict::Live {
            ips: vec!["127.0.0.1".into()],
            resolved_at: Utc::now(),
        },
    );

    let dir = tempfile::tempdir().unwrap();
    let urls: Vec<String> = (0..10).map(|i| format!("http://r.test:{port}/{i}")).collect();

    {
        let store = Arc::new(ResultStore::open(dir.path(), 2, 1).unwrap());
        store
            .write(recrawl::engine::UrlOutcome {
                url: urls[0].clone(),
                domain: "r.test".into(),
                outcome: Outcome::Ok {
                    status: 200,
                    content_type: None,
                    body_size: 0,
                    truncated: false,
                    final_url: urls[0].clone(),
                    latency_ms: 1,
                    retries: 0,
                },
                recorded_at: Utc::now(),
            })
            .unwrap();
        store.flush().unwrap();
    }

    let already = ResultStore::load_already_processed(dir.path()).unwrap();
    assert_eq!(already.len(), 1);

    let remaining_seeds: Vec<Seed> = urls
        .iter()
        .filter(|u| !already.contains(*u))
        .map(|u| seed(u, "r.test"))
        .collect();
    assert_eq!(remaining_seeds.len(), 9);

    let transport = Arc::new(
        Transport::new(2, 8, cache.clone(), Duration::from_secs(5), "recrawl-test/0.1", 4096, FetchMode::Full).unwrap(),
    );
    let store = Arc::new(ResultStore::open(dir.path(), 2, 100).unwrap());
    let stats = Arc::new(Stats::new(remaining_seeds.len() as u64));

    engine::run(
        remaining_seeds,
        Arc::new(already),
        stats,
        transport,
        cache,
        store.clone(),
        CancellationToken::new(),
        EngineConfig {
            workers: 4,
            retry: RetryPolicy {
                max_retries: 0,
                base_backoff: Duration::from_millis(1),
            },
        },
    )
    .await;
    store.flush().unwrap();

    let final_set = ResultStore::load_already_processed(dir.path()).unwrap();
    assert_eq!(final_set.len(), 10);
}

#[tokio::test]
async fn empty_seed_set_completes_cleanly() {
    let cache = Arc::new(DnsCache::new());
    let dir = tempfile::tempdir().unwrap();
    let store = run_engine(Vec::new(), cache, dir.path(), FetchMode::Full, 8).await;
    store.flush().unwrap();

    let processed = ResultStore::load_already_processed(dir.path()).unwrap();
    assert!(processed.is_empty());
}

#[tokio::test]
async fn all_domains_dead_opens_zero_sockets() {
    let cache = Arc::new(DnsCache::new());
    cache.insert_if_absent(
        "dead1.test".into(),
        Verdict::Dead {
            reason: DeadReason::Nxdomain,
            error: "no such host".into(),
            observed_at: Utc::now(),
        },
    );
    cache.insert_if_absent(
        "dead2.test".into(),
        Verdict::Dead {
            reason: DeadReason::Nxdomain,
            error: "no such host".into(),
            observed_at: Utc::now(),
        },
    );

    let seeds = vec![
        seed("http://dead1.test/a", "dead1.test"),
        seed("http://dead2.test/b", "dead2.test"),
    ];

    let dir = tempfile::tempdir().unwrap();
    let store = run_engine(seeds, cache, dir.path(), FetchMode::Full, 8).await;
    store.flush().unwrap();

    let rows: Vec<_> = (0..2)
        .flat_map(|i| recrawl::store::read_shard_file(&dir.path().join(format!("shard-{i:03}"))).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| matches!(r.outcome, Outcome::DnsSkipped { .. })));
}
