//! Tool configuration
//!
//! Loaded from an optional JSON file; every field falls back to its default.

use crate::multisig::{FeeCeilings, Ttl};
use crate::storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Blocks a proposal stays open when no TTL is given
pub const DEFAULT_TTL_BLOCKS: u64 = 20;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    /// Ceilings applied when attaching a new generalized account
    pub fee_protection: FeeCeilings,
    pub default_ttl: Ttl,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            fee_protection: FeeCeilings::default(),
            default_ttl: Ttl::Relative(DEFAULT_TTL_BLOCKS),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = dir;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.state_file.is_empty() {
            return Err(ConfigError::Invalid("storage.state_file is empty".into()));
        }
        if let Ttl::Relative(0) = self.default_ttl {
            return Err(ConfigError::Invalid(
                "default_ttl must be at least one block".into(),
            ));
        }
        Ok(())
    }
}
