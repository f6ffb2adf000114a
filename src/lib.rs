//! pkgsearch: crawler and ranking backend for a package search engine
//!
//! This crate discovers packages and their authors on code-hosting sites,
//! crawls package metadata while tolerating broken or hostile upstreams,
//! keeps incremental re-crawl bookkeeping, and scores crawled packages
//! against search queries.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod identity;
pub mod model;
pub mod ranking;
pub mod storage;

use std::error::Error as StdError;
use thiserror::Error;

/// Main error type for pkgsearch operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Document error: {0}")]
    Document(#[from] crawler::DocError),

    /// An error annotated with the operation that produced it
    #[error("{context}: {source}")]
    Crawl {
        context: String,
        source: Box<SearchError>,
    },

    #[error("Panic while crawling {target}: {message}")]
    Panic { target: String, message: String },

    #[error("Invalid person id: {0}")]
    InvalidPersonId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record codec error: {0}")]
    Codec(#[from] model::CodecError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Discovery error: {0}")]
    Discovery(String),
}

impl SearchError {
    /// Wraps this error with a description of the failing operation
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Crawl {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Follows the `source()` chain down to the innermost error
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for pkgsearch operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl_package, crawl_person, is_bad_package, CrawlOutcome, CRAWLER_VERSION};
pub use identity::{author_of, full_project_of, host_of, project_of};
pub use model::{CrawlResultAction, CrawlingEntry, Package, Person, PersonId};
pub use ranking::{match_score, static_score, test_static_score, HitInfo};
