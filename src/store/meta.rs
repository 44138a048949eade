//! Small key/value side table for run metadata (run id, start/finish time,
//! workers, mode) — spec.md §4.6.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::error::StoreError;

#[derive(Debug, Default, Clone)]
pub struct Meta {
    entries: BTreeMap<String, String>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&text).unwrap_or_default();
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            let text = serde_json::to_string_pretty(&self.entries)?;
            file.write_all(text.as_bytes())?;
            file.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        let mut meta = Meta::new();
        meta.set("run_id", "abc123");
        meta.set("workers", "50000");
        meta.save(&path).unwrap();

        let loaded = Meta::load(&path).unwrap();
        assert_eq!(loaded.get("run_id"), Some("abc123"));
        assert_eq!(loaded.get("workers"), Some("50000"));
    }

    #[test]
    fn missing_file_yields_empty_meta() {
        let meta = Meta::load(Path::new("/nonexistent/meta.json")).unwrap();
        assert!(meta.get("run_id").is_none());
    }
}
