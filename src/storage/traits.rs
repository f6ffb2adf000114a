//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{CodecError, CrawlResultAction, CrawlingEntry, Package};
use crate::storage::{EntryKind, RunRecord, RunStatus, StorageStats};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record for {key}: {source}")]
    Corrupt { key: String, source: CodecError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler.
/// The coordinator owns the only handle; nothing here is shared between
/// crawl tasks.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Crawl Entries =====

    /// Gets the crawl entry for a package path or person id
    fn get_entry(&self, kind: EntryKind, key: &str) -> StorageResult<Option<CrawlingEntry>>;

    /// Inserts or replaces a crawl entry
    fn put_entry(&mut self, kind: EntryKind, key: &str, entry: &CrawlingEntry)
        -> StorageResult<()>;

    /// Inserts an entry only if none exists yet
    ///
    /// # Returns
    ///
    /// True if the entry was inserted
    fn ensure_entry(
        &mut self,
        kind: EntryKind,
        key: &str,
        entry: &CrawlingEntry,
    ) -> StorageResult<bool>;

    /// Removes a crawl entry
    fn delete_entry(&mut self, kind: EntryKind, key: &str) -> StorageResult<()>;

    /// Gets all entries due at `now`, earliest first
    fn due_entries(
        &self,
        kind: EntryKind,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<(String, CrawlingEntry)>>;

    // ===== Package Snapshots =====

    /// Gets the latest snapshot of a package
    fn get_doc(&self, path: &str) -> StorageResult<Option<Package>>;

    /// Stores the latest snapshot of a package
    fn put_doc(&mut self, package: &Package) -> StorageResult<()>;

    /// Removes a package snapshot
    fn delete_doc(&mut self, path: &str) -> StorageResult<()>;

    // ===== Index Actions =====

    /// Appends an action to the log for the indexing stage
    fn append_action(
        &mut self,
        run_id: i64,
        path: &str,
        action: &CrawlResultAction,
    ) -> StorageResult<()>;

    /// Gets the actions logged by one run, in order
    fn actions_for_run(&self, run_id: i64) -> StorageResult<Vec<(String, CrawlResultAction)>>;

    // ===== Statistics =====

    /// Counts rows in every table
    fn stats(&self) -> StorageResult<StorageStats>;
}
