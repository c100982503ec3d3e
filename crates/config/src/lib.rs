//! Stage configuration, serialized as TOML.
//!
//! Every stage-specific knob lives under [`StageConfig`] so a node operator can tune commit
//! thresholds and ETL buffer sizes from a single config file without touching code.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level config file shape. Only the `[stages]` table exists today; other top-level tables
/// (networking, RPC, ...) are the ambient node's concern, not this sync core's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stages: StageConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub execution: ExecutionConfig,
    pub account_hashing: HashingConfig,
    pub storage_hashing: HashingConfig,
    pub intermediate_hashes: IntermediateHashesConfig,
    pub history_index: HistoryIndexConfig,
    pub etl: EtlConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::default(),
            account_hashing: HashingConfig::default(),
            storage_hashing: HashingConfig::default(),
            intermediate_hashes: IntermediateHashesConfig::default(),
            history_index: HistoryIndexConfig::default(),
            etl: EtlConfig::default(),
        }
    }
}

/// How many blocks the Execution stage processes before committing its write transaction and
/// persisting `StageData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub commit_threshold: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { commit_threshold: 5_000 }
    }
}

/// Shared shape for the account- and storage-hashing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub commit_threshold: u64,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self { commit_threshold: 100_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntermediateHashesConfig {
    pub commit_threshold: u64,
}

impl Default for IntermediateHashesConfig {
    fn default() -> Self {
        Self { commit_threshold: 100_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryIndexConfig {
    pub commit_threshold: u64,
}

impl Default for HistoryIndexConfig {
    fn default() -> Self {
        Self { commit_threshold: 100_000 }
    }
}

/// ETL buffer sizing. `dir` defaults to the platform temp dir (`None` means "ask the OS").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub buffer_size: usize,
    pub hash_collector_buffer_size: usize,
    pub dir: Option<PathBuf>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256 * 1024 * 1024,
            hash_collector_buffer_size: 256 * 1024,
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = StageConfig::default();
        assert_eq!(cfg.execution.commit_threshold, 5_000);
        assert_eq!(cfg.etl.buffer_size, 256 * 1024 * 1024);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.stages.execution.commit_threshold = 42;
        let toml = cfg.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let parsed = Config::from_toml_str("[stages.execution]\ncommit_threshold = 7\n").unwrap();
        assert_eq!(parsed.stages.execution.commit_threshold, 7);
        assert_eq!(parsed.stages.etl.buffer_size, EtlConfig::default().buffer_size);
    }
}
