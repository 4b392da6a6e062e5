//! Ledger persistence layer
//!
//! Saves and loads the host ledger (including every attached generalized
//! account) as pretty JSON, with rotating backups and named snapshots.

use crate::runtime::Ledger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SNAPSHOT_SUFFIX: &str = ".snapshot.json";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ga_multisig_data"),
            state_file: "ledger.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// A ledger as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub saved_at: DateTime<Utc>,
    pub ledger: Ledger,
}

impl LedgerSnapshot {
    pub fn capture(ledger: &Ledger) -> Self {
        Self {
            saved_at: Utc::now(),
            ledger: ledger.clone(),
        }
    }
}

/// Ledger storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}{}", name, SNAPSHOT_SUFFIX))
    }

    /// Save the ledger, keeping the previous state as backup 0
    pub fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        write_atomic(&self.config.data_dir, &path, &LedgerSnapshot::capture(ledger))?;
        log::debug!("Saved ledger at height {} to {:?}", ledger.height(), path);
        Ok(())
    }

    /// Load the saved ledger
    pub fn load(&self) -> Result<Ledger, StorageError> {
        let path = self.state_path();
        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Ledger file not found".to_string(),
            ));
        }
        Ok(read_snapshot(&path)?.ledger)
    }

    /// Load the saved ledger, or start a fresh one
    pub fn load_or_default(&self) -> Result<Ledger, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(Ledger::new())
        }
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    pub fn restore_backup(&self, backup_index: usize) -> Result<Ledger, StorageError> {
        let backup_path = self.backup_path(backup_index);
        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }
        Ok(read_snapshot(&backup_path)?.ledger)
    }

    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Write a named checkpoint of `ledger`
    pub fn snapshot(&self, name: &str, ledger: &Ledger) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        let path = self.snapshot_path(name);
        write_atomic(&self.config.data_dir, &path, &LedgerSnapshot::capture(ledger))?;
        log::debug!("Wrote snapshot '{}' at height {}", name, ledger.height());
        Ok(path)
    }

    /// Read a named checkpoint back
    pub fn rollback(&self, name: &str) -> Result<LedgerSnapshot, StorageError> {
        validate_name(name)?;
        let path = self.snapshot_path(name);
        if !path.exists() {
            return Err(StorageError::SnapshotNotFound(name.to_string()));
        }
        let snapshot = read_snapshot(&path)?;
        log::info!(
            "Rolled back to snapshot '{}' (height {}, saved {})",
            name,
            snapshot.ledger.height(),
            snapshot.saved_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(snapshot)
    }

    /// Names of all stored snapshots, sorted
    pub fn list_snapshots(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let file_name = entry?.file_name();
            if let Some(name) = file_name
                .to_str()
                .and_then(|n| n.strip_suffix(SNAPSHOT_SUFFIX))
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.state_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            snapshot_count: self.list_snapshots()?.len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub snapshot_count: usize,
    pub data_dir: PathBuf,
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidData(format!(
            "Invalid snapshot name '{}'",
            name
        )))
    }
}

fn write_atomic(dir: &Path, path: &Path, snapshot: &LedgerSnapshot) -> Result<(), StorageError> {
    let temp_path = dir.join("ledger.tmp");
    let file = fs::File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<LedgerSnapshot, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    // Well-formed JSON that breaks an account invariant is bad data, not a
    // serializer failure
    serde_json::from_reader(reader).map_err(|e| {
        if e.is_data() {
            StorageError::InvalidData(e.to_string())
        } else {
            StorageError::SerializationError(e)
        }
    })
}
