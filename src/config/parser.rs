use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
///
/// # Arguments
///
/// * `content` - TOML document
///
/// # Returns
///
/// * `Ok(Config)` - Parsed and validated configuration
/// * `Err(ConfigError)` - The document is not valid TOML or fails validation
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored with every run so runs can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    load_config_with_overrides(path, |_| {})
}

/// Loads a configuration, applies command-line overrides, then validates
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
/// * `overrides` - Applied to the parsed config before validation, so a file
///   without targets is accepted when the command line supplies them
///
/// # Returns
///
/// The validated configuration and the SHA-256 hash of the file content.
/// The hash does not reflect overrides.
pub fn load_config_with_overrides<F>(
    path: &Path,
    overrides: F,
) -> Result<(Config, String), ConfigError>
where
    F: FnOnce(&mut Config),
{
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    overrides(&mut config);
    validate(&config)?;
    Ok((config, hash_content(&content)))
}
