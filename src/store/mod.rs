//! Sharded append-only result store (C6).

mod meta;
mod shard;

pub use meta::Meta;
pub use shard::read_shard_file;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use shard::Shard;

use crate::engine::UrlOutcome;
use crate::error::StoreError;

/// `N` shards, each an append file, chosen by `hash(domain) mod N`
/// (spec.md §4.6).
pub struct ResultStore {
    dir: PathBuf,
    shards: Vec<Shard>,
    meta: Mutex<Meta>,
}

impl ResultStore {
    pub fn open(dir: &Path, shard_count: usize, batch_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let shard_count = shard_count.max(1);

        let shards = (0..shard_count)
            .map(|i| Shard::new(dir.join(format!("shard-{i:03}")), batch_size))
            .collect();

        let meta = Meta::load(&dir.join("meta.json"))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            shards,
            meta: Mutex::new(meta),
        })
    }

    fn shard_for(&self, domain: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        domain.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// O(1) amortized; never blocks on network (spec.md §4.6 contract).
    pub fn write(&self, outcome: UrlOutcome) -> Result<(), StoreError> {
        self.shard_for(&outcome.domain).write(outcome)
    }

    /// Force all per-shard buffers to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        for shard in &self.shards {
            shard.flush()?;
        }
        self.meta.lock().expect("meta poisoned").save(&self.dir.join("meta.json"))?;
        Ok(())
    }

    pub fn set_meta(&self, key: &str, value: &str) {
        self.meta.lock().expect("meta poisoned").set(key, value);
    }

    /// Read every shard file under `dir` and return the set of URLs with
    /// terminal outcomes (used on `--resume`).
    pub fn load_already_processed(dir: &Path) -> Result<HashSet<String>, StoreError> {
        let mut urls = HashSet::new();
        for row in Self::read_all_outcomes(dir)? {
            urls.insert(row.url);
        }
        Ok(urls)
    }

    /// Read every shard file under `dir` and return every recorded outcome,
    /// in shard order (used for post-run failure-rate aggregation).
    pub fn read_all_outcomes(dir: &Path) -> Result<Vec<UrlOutcome>, StoreError> {
        let mut rows = Vec::new();
        if !dir.exists() {
            return Ok(rows);
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("shard-"))
            })
            .collect();
        entries.sort();

        for path in entries {
            rows.extend(read_shard_file(&path)?);
        }
        Ok(rows)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Outcome;
    use chrono::Utc;

    fn sample(url: &str, domain: &str) -> UrlOutcome {
        UrlOutcome {
            url: url.into(),
            domain: domain.into(),
            outcome: Outcome::Ok {
                status: 200,
                content_type: None,
                body_size: 0,
                truncated: false,
                final_url: url.to_string(),
                latency_ms: 1,
                retries: 0,
            },
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn written_and_flushed_outcomes_are_resumable() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path(), 4, 10).unwrap();

        store.write(sample("https://a.example/1", "a.example")).unwrap();
        store.write(sample("https://b.example/1", "b.example")).unwrap();
        store.flush().unwrap();

        let processed = ResultStore::load_already_processed(dir.path()).unwrap();
        assert!(processed.contains("https://a.example/1"));
        assert!(processed.contains("https://b.example/1"));
    }

    #[test]
    fn empty_dir_yields_empty_skip_set() {
        let dir = tempfile::tempdir().unwrap();
        let processed = ResultStore::load_already_processed(dir.path()).unwrap();
        assert!(processed.is_empty());
    }

    #[test]
    fn meta_persists_across_flush() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path(), 2, 10).unwrap();
        store.set_meta("run_id", "r1");
        store.flush().unwrap();

        let reopened = ResultStore::open(dir.path(), 2, 10).unwrap();
        assert_eq!(reopened.meta.lock().unwrap().get("run_id"), Some("r1"));
    }
}
