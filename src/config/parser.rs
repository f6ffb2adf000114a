use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// Storage paths are taken as written; see [`load_config`] for how relative
/// paths are resolved when loading from a file.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of the raw configuration text
///
/// Each crawl run records this so runs made with different settings can be
/// told apart.
pub fn config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Resolves relative storage paths against the config file's directory
///
/// The crawler is usually started from cron with an arbitrary working
/// directory.
fn resolve_storage_paths(config: &mut Config, path: &Path) {
    let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };

    for value in [
        &mut config.storage.database_path,
        &mut config.storage.imports_dir,
    ] {
        if Path::new(value.as_str()).is_relative() {
            *value = base.join(value.as_str()).to_string_lossy().into_owned();
        }
    }
}

/// Loads a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Validated configuration with storage paths resolved
/// * `Err(ConfigError)` - Failed to read, parse, or validate the file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use pkgsearch::config::load_config;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Database: {}", config.storage.database_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with_hash(path).map(|(config, _)| config)
}

/// Loads a configuration file together with the hash of its content
///
/// The file is read once; the hash covers exactly the text that was parsed.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    resolve_storage_paths(&mut config, path);
    Ok((config, config_hash(&content)))
}
