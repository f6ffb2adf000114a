use serde::Deserialize;

/// Main configuration structure for pkgsearch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Longest allowed run, in minutes
pub const MAX_RUN_MINUTES: u64 = 24 * 60;

/// Longest allowed re-crawl, person or retry interval, in hours
pub const MAX_INTERVAL_HOURS: i64 = 24 * 365 * 5;

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// How long one run keeps dispatching new crawls (minutes)
    pub due_per_run_minutes: u64,

    /// Maximum number of packages and persons crawled at the same time
    pub max_concurrent_crawls: u32,

    /// Delay before a successfully crawled package is crawled again (hours)
    #[serde(default = "default_recrawl_interval")]
    pub recrawl_interval_hours: i64,

    /// Delay before a person is crawled again (hours)
    #[serde(default = "default_person_interval")]
    pub person_interval_hours: i64,

    /// Delay before a failed crawl is retried (hours)
    #[serde(default = "default_retry_after")]
    pub retry_after_hours: i64,

    /// Reschedule packages of recently updated GitHub repositories
    #[serde(default)]
    pub refresh_github_updates: bool,
}

fn default_recrawl_interval() -> i64 {
    24 * 5
}

fn default_person_interval() -> i64 {
    24 * 7
}

fn default_retry_after() -> i64 {
    12
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory holding bulk-import segments
    pub imports_dir: String,
}

/// Remote services the crawler talks to
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EndpointConfig {
    /// Document API; a package is fetched from `{doc-api}/{import path}`
    pub doc_api: String,

    /// Listing of all known packages
    pub package_list: String,

    pub github_api: String,

    pub bitbucket_api: String,

    /// Repository search page scraped for recent updates
    pub github_search: String,

    /// "+1" counter JSON-RPC endpoint
    pub plusone: String,

    /// "like" counter endpoint, queried as `?ids={url}`
    pub like_button: String,

    /// Optional proxy for all requests
    pub proxy: Option<String>,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            doc_api: "https://api.godoc.org/docs".to_string(),
            package_list: "https://api.godoc.org/packages".to_string(),
            github_api: "https://api.github.com".to_string(),
            bitbucket_api: "https://api.bitbucket.org".to_string(),
            github_search: "https://github.com/search?l=go&o=desc&q=stars%3A%3E%3D0&s=updated&type=Repositories".to_string(),
            plusone: "https://clients6.google.com/rpc".to_string(),
            like_button: "https://graph.facebook.com/".to_string(),
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}
