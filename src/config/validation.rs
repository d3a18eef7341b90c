use crate::config::types::{CrawlerConfig, GrammarConfig, Settings, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_crawler_config(&settings.crawler)?;
    validate_user_agent_config(&settings.user_agent)?;
    validate_storage_config(&settings.storage)?;
    validate_grammar_config(&settings.grammar)?;
    Ok(())
}

fn require_range(name: &str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    require_range("max_workers", config.max_workers, 1, 100)?;
    require_range("link_fanout", config.link_fanout, 1, 1000)?;
    require_range("check_concurrency", config.check_concurrency, 1, 100)?;
    require_range("link_probe_concurrency", config.link_probe_concurrency, 1, 100)?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates grammar oracle configuration
///
/// The endpoint is only checked when the oracle is enabled.
fn validate_grammar_config(config: &GrammarConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid grammar endpoint: {}", e)))?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Grammar endpoint must be http(s), got '{}'",
            config.endpoint
        )));
    }

    if config.language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "grammar language cannot be empty".to_string(),
        ));
    }

    if config.chunk_size < 100 {
        return Err(ConfigError::Validation(format!(
            "grammar chunk_size must be >= 100, got {}",
            config.chunk_size
        )));
    }

    Ok(())
}
