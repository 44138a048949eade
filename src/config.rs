//! Run configuration: a TOML-backed struct, overridable by CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_workers() -> usize {
    50_000
}
fn default_dns_workers() -> usize {
    2_000
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_dns_timeout_secs() -> u64 {
    5
}
fn default_transport_shards() -> usize {
    16
}
fn default_max_conns_per_domain() -> usize {
    8
}
fn default_result_shards() -> usize {
    12
}
fn default_batch_size() -> usize {
    2_000
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_status_only_body_cap() -> usize {
    4 * 1024
}
fn default_user_agent() -> String {
    "recrawl/0.1".to_string()
}
fn default_verify_workers() -> usize {
    10
}
fn default_verify_dns_timeout_secs() -> u64 {
    10
}
fn default_verify_http_timeout_secs() -> u64 {
    30
}

/// Static defaults merged with whatever the caller overrides via CLI flags
/// (spec.md §4 throughout; precedence: flags over file over these
/// defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_dns_workers")]
    pub dns_workers: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    #[serde(default = "default_transport_shards")]
    pub transport_shards: usize,
    #[serde(default = "default_max_conns_per_domain")]
    pub max_conns_per_domain: usize,
    #[serde(default = "default_result_shards")]
    pub result_shards: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_status_only_body_cap")]
    pub status_only_body_cap: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_verify_workers")]
    pub verify_workers: usize,
    #[serde(default = "default_verify_dns_timeout_secs")]
    pub verify_dns_timeout_secs: u64,
    #[serde(default = "default_verify_http_timeout_secs")]
    pub verify_http_timeout_secs: u64,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub dns_cache_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            dns_workers: default_dns_workers(),
            timeout_secs: default_timeout_secs(),
            dns_timeout_secs: default_dns_timeout_secs(),
            transport_shards: default_transport_shards(),
            max_conns_per_domain: default_max_conns_per_domain(),
            result_shards: default_result_shards(),
            batch_size: default_batch_size(),
            max_body_bytes: default_max_body_bytes(),
            status_only_body_cap: default_status_only_body_cap(),
            user_agent: default_user_agent(),
            verify_workers: default_verify_workers(),
            verify_dns_timeout_secs: default_verify_dns_timeout_secs(),
            verify_http_timeout_secs: default_verify_http_timeout_secs(),
            output_dir: None,
            dns_cache_path: None,
        }
    }
}

impl Config {
    /// Load a config file if present; an absent path is not an error — the
    /// caller runs on defaults plus whatever flags it merges in afterward.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn verify_dns_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_dns_timeout_secs)
    }

    pub fn verify_http_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_http_timeout_secs)
    }

    pub fn dns_cache_path(&self) -> PathBuf {
        self.dns_cache_path
            .clone()
            .unwrap_or_else(|| self.output_dir().join("dns_cache.jsonl"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("./recrawl-out"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_path_yields_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.workers, 50_000);
        assert_eq!(config.transport_shards, 16);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = Config::load(Some(Path::new("/nonexistent/recrawl.toml"))).unwrap();
        assert_eq!(config.max_conns_per_domain, 8);
    }

    #[test]
    fn partial_toml_fills_remaining_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recrawl.toml");
        std::fs::write(&path, "workers = 100\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.workers, 100);
        assert_eq!(config.transport_shards, 16);
    }
}
