//! Crate-wide error types.
//!
//! Per-URL and per-domain failures are never propagated as `Err` — they are
//! captured as [`crate::engine::Outcome`] / [`crate::dns::Verdict`] data and
//! recorded by the stores. Only configuration, extraction, and fatal I/O
//! failures use this error path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum SeedExtractError {
    #[error("seed source not found: {0}")]
    MissingSource(String),
    #[error("seed source missing required columns: {0:?}")]
    SchemaMismatch(Vec<String>),
    #[error("seed extraction I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("failed to build resolver: {0}")]
    Build(String),
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("shard I/O error on shard {shard}: {source}")]
    ShardIo {
        shard: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("meta I/O error: {0}")]
    MetaIo(#[from] std::io::Error),
    #[error("row serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to build transport shard: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    SeedExtract(#[from] SeedExtractError),
    #[error(transparent)]
    Dns(#[from] DnsError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("run cancelled")]
    Cancelled,
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
