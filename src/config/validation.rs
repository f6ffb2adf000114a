use crate::config::types::{
    Config, CrawlerConfig, EndpointConfig, StorageConfig, UserAgentConfig, MAX_INTERVAL_HOURS,
    MAX_RUN_MINUTES,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_endpoints(&config.endpoints)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.due_per_run_minutes < 1 || config.due_per_run_minutes > MAX_RUN_MINUTES {
        return Err(ConfigError::Validation(format!(
            "due_per_run_minutes must be between 1 and {}, got {}",
            MAX_RUN_MINUTES, config.due_per_run_minutes
        )));
    }

    if config.max_concurrent_crawls < 1 || config.max_concurrent_crawls > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_crawls must be between 1 and 100, got {}",
            config.max_concurrent_crawls
        )));
    }

    for (name, hours) in [
        ("recrawl_interval_hours", config.recrawl_interval_hours),
        ("person_interval_hours", config.person_interval_hours),
        ("retry_after_hours", config.retry_after_hours),
    ] {
        if !(1..=MAX_INTERVAL_HOURS).contains(&hours) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_INTERVAL_HOURS, hours
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.imports_dir.is_empty() {
        return Err(ConfigError::Validation(
            "imports_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every endpoint is an absolute http(s) URL
fn validate_endpoints(config: &EndpointConfig) -> Result<(), ConfigError> {
    let endpoints = [
        ("doc_api", config.doc_api.as_str()),
        ("package_list", config.package_list.as_str()),
        ("github_api", config.github_api.as_str()),
        ("bitbucket_api", config.bitbucket_api.as_str()),
        ("github_search", config.github_search.as_str()),
        ("plusone", config.plusone.as_str()),
        ("like_button", config.like_button.as_str()),
    ];

    for (name, value) in endpoints {
        validate_http_url(name, value)?;
    }

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        validate_http_url("proxy", proxy)?;
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let (local, domain) = match email.split_once('@') {
        Some(parts) if !parts.1.contains('@') => parts,
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
