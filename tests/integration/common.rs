use pkgsearch::config::{Config, CrawlerConfig, EndpointConfig, StorageConfig, UserAgentConfig};
use pkgsearch::crawler::{build_http_client, ResilientFetcher};
use reqwest::Client;
use serde_json::json;
use std::path::Path;

/// Creates a test configuration pointing every endpoint at `base_url`
pub fn create_test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            due_per_run_minutes: 5,
            max_concurrent_crawls: 4,
            recrawl_interval_hours: 120,
            person_interval_hours: 168,
            retry_after_hours: 12,
            refresh_github_updates: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: dir.join("crawl.db").to_string_lossy().into_owned(),
            imports_dir: dir.join("imports").to_string_lossy().into_owned(),
        },
        endpoints: EndpointConfig {
            doc_api: format!("{}/docs", base_url),
            package_list: format!("{}/packages", base_url),
            github_api: format!("{}/gh", base_url),
            bitbucket_api: format!("{}/bb", base_url),
            github_search: format!("{}/search?q=go", base_url),
            plusone: format!("{}/rpc", base_url),
            like_button: format!("{}/like", base_url),
            proxy: None,
            accept_invalid_certs: false,
        },
    }
}

pub fn test_client(config: &Config) -> ResilientFetcher<Client> {
    let client = build_http_client(&config.user_agent, &config.endpoints)
        .expect("Failed to build client");
    ResilientFetcher::new(client)
}

/// Document API body for `github.com/alice/fast`
pub fn fast_document() -> serde_json::Value {
    json!({
        "importPath": "github.com/alice/fast",
        "name": "fast",
        "synopsis": "Package fast does things quickly.",
        "doc": "Package fast does things quickly.",
        "projectURL": "https://github.com/alice/fast",
        "starCount": -1,
        "readmeFiles": [{"name": "README.md", "data": "# fast\n\nQuick things."}],
        "imports": ["fmt", "github.com/bob/util"],
        "testImports": ["testing"],
        "funcs": ["Run"],
        "types": ["Engine"]
    })
}

/// "+1" counter reply
pub fn plusone_reply(count: f64) -> serde_json::Value {
    json!([{ "result": { "metadata": { "globalCounts": { "count": count } } } }])
}
