//! One result-store shard: an append file protected by one lock, with a
//! per-shard buffer flushed as a single transactional block (spec.md §4.6).

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::engine::UrlOutcome;
use crate::error::StoreError;

pub struct Shard {
    path: PathBuf,
    buffer: Mutex<Vec<UrlOutcome>>,
    batch_size: usize,
}

impl Shard {
    pub fn new(path: PathBuf, batch_size: usize) -> Self {
        Self {
            path,
            buffer: Mutex::new(Vec::with_capacity(batch_size)),
            batch_size: batch_size.max(1),
        }
    }

    /// Buffer `outcome`; flush to disk if the buffer has reached capacity.
    pub fn write(&self, outcome: UrlOutcome) -> Result<(), StoreError> {
        let mut pending = None;
        {
            let mut buffer = self.buffer.lock().expect("shard buffer poisoned");
            buffer.push(outcome);
            if buffer.len() >= self.batch_size {
                pending = Some(std::mem::take(&mut *buffer));
            }
        }
        if let Some(batch) = pending {
            self.append_batch(&batch)?;
        }
        Ok(())
    }

    /// Force the current buffer to disk, regardless of size.
    pub fn flush(&self) -> Result<(), StoreError> {
        let batch = {
            let mut buffer = self.buffer.lock().expect("shard buffer poisoned");
            std::mem::take(&mut *buffer)
        };
        if !batch.is_empty() {
            self.append_batch(&batch)?;
        }
        Ok(())
    }

    fn append_batch(&self, batch: &[UrlOutcome]) -> Result<(), StoreError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::ShardIo {
                shard: shard_index(&self.path),
                source,
            })?;

        let mut out = String::new();
        for outcome in batch {
            out.push_str(&serde_json::to_string(outcome)?);
            out.push('\n');
        }
        file.write_all(out.as_bytes())
            .map_err(|source| StoreError::ShardIo {
                shard: shard_index(&self.path),
                source,
            })?;
        file.flush().map_err(|source| StoreError::ShardIo {
            shard: shard_index(&self.path),
            source,
        })?;
        Ok(())
    }

    /// Read every row of this shard file, skipping corrupt lines.
    pub fn read_all(&self) -> Result<Vec<UrlOutcome>, StoreError> {
        read_shard_file(&self.path)
    }
}

pub fn read_shard_file(path: &Path) -> Result<Vec<UrlOutcome>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<UrlOutcome>(&line) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(error = %e, path = %path.display(), "skipping corrupt result row"),
        }
    }
    Ok(rows)
}

fn shard_index(path: &Path) -> usize {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Outcome;
    use chrono::Utc;

    fn sample(url: &str) -> UrlOutcome {
        UrlOutcome {
            url: url.into(),
            domain: "example.com".into(),
            outcome: Outcome::Ok {
                status: 200,
                content_type: Some("text/html".into()),
                body_size: 10,
                truncated: false,
                final_url: url.to_string(),
                latency_ms: 5,
                retries: 0,
            },
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn buffers_until_batch_size_then_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shard-000");
        let shard = Shard::new(path.clone(), 2);

        shard.write(sample("https://example.com/a")).unwrap();
        assert!(!path.exists());
        shard.write(sample("https://example.com/b")).unwrap();
        assert!(path.exists());

        let rows = read_shard_file(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn explicit_flush_forces_partial_batch_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shard-000");
        let shard = Shard::new(path.clone(), 100);

        shard.write(sample("https://example.com/a")).unwrap();
        shard.flush().unwrap();

        let rows = read_shard_file(&path).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
