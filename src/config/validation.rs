use crate::config::types::{
    ApiConfig, BrowserConfig, Config, EnricherConfig, ExtractorConfig, RunConfig, ScrapeMethod,
    StorageConfig,
};
use crate::model::Target;
use crate::ConfigError;
use url::Url;

const MAX_ITEMS_LIMIT: u32 = 1000;

/// Validates the entire configuration
///
/// # Returns
///
/// The first [`ConfigError::Validation`] found, checked section by section
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target is required".to_string(),
        ));
    }
    parse_targets(&config.targets)?;

    validate_run_config(&config.run)?;
    validate_storage_config(&config.storage)?;

    match config.run.method {
        ScrapeMethod::Api => match &config.api {
            Some(api) => validate_api_config(api)?,
            None => {
                return Err(ConfigError::Validation(
                    "method \"api\" requires an [api] section".to_string(),
                ))
            }
        },
        ScrapeMethod::Browser => match &config.browser {
            Some(browser) => validate_browser_config(browser)?,
            None => {
                return Err(ConfigError::Validation(
                    "method \"browser\" requires a [browser] section".to_string(),
                ))
            }
        },
    }

    if config.run.use_login && config.browser.is_none() {
        return Err(ConfigError::Validation(
            "use-login requires a [browser] section".to_string(),
        ));
    }

    validate_enricher_config(&config.enricher)?;
    validate_extractor_config(&config.extractor)?;

    Ok(())
}

/// Parses every configured target string, failing on the first invalid one
///
/// # Arguments
///
/// * `raw` - Target strings as written in the config, e.g. `@natgeo` or `#viral`
///
/// # Returns
///
/// The targets in their configured order
pub fn parse_targets(raw: &[String]) -> Result<Vec<Target>, ConfigError> {
    raw.iter().map(|s| Target::parse(s)).collect()
}

fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.max_items_per_target < 1 || config.max_items_per_target > MAX_ITEMS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-items-per-target must be between 1 and {}, got {}",
            MAX_ITEMS_LIMIT, config.max_items_per_target
        )));
    }

    if let Some(path) = &config.output_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output-path cannot be empty when set".to_string(),
            ));
        }
    }

    if let Some(path) = &config.summary_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("api.base-url", &config.base_url)?;

    if config.actor.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api.actor cannot be empty".to_string(),
        ));
    }

    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "api.token-env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    validate_http_url("browser.webdriver-url", &config.webdriver_url)?;
    validate_http_url("browser.site-url", &config.site_url)?;
    Ok(())
}

fn validate_enricher_config(config: &EnricherConfig) -> Result<(), ConfigError> {
    validate_http_url("enricher.base-url", &config.base_url)?;

    if config.model.is_empty() || config.embedding_model.is_empty() {
        return Err(ConfigError::Validation(
            "enricher model names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if config.binary.is_empty() {
        return Err(ConfigError::Validation(
            "extractor.binary cannot be empty".to_string(),
        ));
    }

    if config.cdn_host_marker.is_empty() {
        return Err(ConfigError::Validation(
            "extractor.cdn-host-marker cannot be empty".to_string(),
        ));
    }

    if let Some(dir) = &config.download_dir {
        if dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "extractor.download-dir cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates that a configured endpoint is an absolute http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const BASE: &str = r#"
[storage]
database-path = "./reels.db"

[api]
actor = "apify~instagram-reel-scraper"
"#;

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets(&[
            "@natgeo".to_string(),
            "#viral".to_string(),
            "https://www.instagram.com/reel/abc/".to_string(),
        ])
        .unwrap();
        assert_eq!(targets.len(), 3);

        assert!(parse_targets(&["@".to_string()]).is_err());
        assert!(parse_targets(&["".to_string()]).is_err());
    }

    #[test]
    fn test_browser_method_requires_section() {
        let content = format!(
            "targets = [\"@nasa\"]\n[run]\nmethod = \"browser\"\n{}",
            BASE
        );
        let err = parse_config(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_use_login_requires_browser() {
        let content = format!("targets = [\"@nasa\"]\n[run]\nuse-login = true\n{}", BASE);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_max_items_bounds() {
        let zero = format!(
            "targets = [\"@nasa\"]\n[run]\nmax-items-per-target = 0\n{}",
            BASE
        );
        assert!(parse_config(&zero).is_err());

        let too_many = format!(
            "targets = [\"@nasa\"]\n[run]\nmax-items-per-target = 5000\n{}",
            BASE
        );
        assert!(parse_config(&too_many).is_err());
    }

    #[test]
    fn test_download_dir() {
        let set = format!(
            "targets = [\"@nasa\"]\n{}\n[extractor]\ndownload-dir = \"./videos\"\n",
            BASE
        );
        let config = parse_config(&set).unwrap();
        assert_eq!(config.extractor.download_dir.as_deref(), Some("./videos"));

        let blank = format!(
            "targets = [\"@nasa\"]\n{}\n[extractor]\ndownload-dir = \" \"\n",
            BASE
        );
        assert!(parse_config(&blank).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("x", "https://api.apify.com/v2").is_ok());
        assert!(validate_http_url("x", "http://localhost:4444").is_ok());
        assert!(validate_http_url("x", "ftp://example.com").is_err());
        assert!(validate_http_url("x", "not a url").is_err());
    }
}
