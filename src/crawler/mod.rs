//! Crawler module for package and person crawling
//!
//! This module contains the core crawling logic, including:
//! - The HTTP client seam and the negative-caching fetcher
//! - Package document and person listing sources
//! - Popularity signal fusion and readme handling
//! - The single-package and single-person pipelines
//! - Deadline-bounded scheduling and overall run coordination

mod coordinator;
mod document;
mod fetcher;
mod http;
mod package;
mod person;
mod readme;
mod scheduler;
mod signals;

pub use coordinator::{run_crawl, Coordinator, RunSummary};
pub use document::{DocApiSource, DocError, Document, DocumentSource, ReadmeFile};
pub use fetcher::ResilientFetcher;
pub use http::{build_http_client, get_request, user_agent_string, HttpClient, HttpResponse};
pub use package::{
    crawl_package, crawl_package_isolated, is_bad_package, CrawlOutcome, MAX_README_BYTES,
};
pub use person::{crawl_person, HostingApis, PersonSite, PersonSource};
pub use readme::{readme_to_text, synopsis};
pub use scheduler::{QueuedItem, ScheduledCrawl, Scheduler};
pub use signals::{fuse_stars, like_button, plusone, SignalEndpoints};

use crate::config::Config;
use crate::SearchError;
use std::sync::Arc;

/// Version of the crawl logic
///
/// Bump this whenever a change to the pipeline should invalidate stored
/// etags; entries written by another version are fully re-fetched.
pub const CRAWLER_VERSION: u32 = 1;

/// Everything a single package or person crawl needs
///
/// Cheap to share between tasks behind an [`Arc`].
pub struct CrawlContext {
    pub client: Arc<dyn HttpClient>,
    pub docs: Arc<dyn DocumentSource>,
    pub persons: Arc<dyn PersonSource>,
    pub signals: SignalEndpoints,
}

impl CrawlContext {
    /// Builds the production context: a reqwest client wrapped in a
    /// [`ResilientFetcher`], talking to the configured endpoints
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let client = build_http_client(&config.user_agent, &config.endpoints)?;
        let endpoints = &config.endpoints;

        Ok(Self {
            client: Arc::new(ResilientFetcher::new(client)),
            docs: Arc::new(DocApiSource::new(endpoints.doc_api.clone())),
            persons: Arc::new(HostingApis::new(
                endpoints.github_api.clone(),
                endpoints.bitbucket_api.clone(),
            )),
            signals: SignalEndpoints {
                plusone: endpoints.plusone.clone(),
                like_button: endpoints.like_button.clone(),
            },
        })
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl run. It will:
/// 1. Open storage and record a new run
/// 2. Schedule bulk-imported packages
/// 3. Crawl due packages and persons until the run deadline
/// 4. Mark the run as completed
pub async fn crawl(config: Config, config_hash: &str) -> Result<RunSummary, SearchError> {
    run_crawl(config, config_hash).await
}
