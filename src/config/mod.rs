//! Configuration module for pkgsearch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pkgsearch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Each run lasts {} minutes", config.crawler.due_per_run_minutes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EndpointConfig, StorageConfig, UserAgentConfig, MAX_INTERVAL_HOURS,
    MAX_RUN_MINUTES,
};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
