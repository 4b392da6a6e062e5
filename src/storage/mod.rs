//! Storage module for ledger persistence

pub mod persistence;

pub use persistence::{LedgerSnapshot, Storage, StorageConfig, StorageError, StorageStats};
