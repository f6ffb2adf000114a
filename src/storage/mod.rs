//! Storage module for persisting crawl state
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Package and person crawl entries that drive scheduling
//! - The latest snapshot of every crawled package
//! - The append-only log of index actions
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SearchError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SearchError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SearchError> {
    SqliteStorage::new(path)
}

/// The two kinds of crawlable things
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Keyed by import path
    Package,
    /// Keyed by `site:username`
    Person,
}

impl EntryKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Package => "package_entries",
            Self::Person => "person_entries",
        }
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Row counts for `--stats`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub packages: u64,
    pub persons: u64,
    pub docs: u64,
    pub actions: u64,
    pub runs: u64,
}
