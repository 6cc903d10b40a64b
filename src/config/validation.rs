use crate::config::types::{BrowserConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Largest accepted concurrency batch; each slot is a live browser tab
const MAX_BATCH_SIZE: usize = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;

    if config.concurrency_batch_size < 1 || config.concurrency_batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "concurrency_batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.concurrency_batch_size
        )));
    }

    if config.navigation_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 100ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.network_idle_ms >= config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "network_idle_ms ({}ms) must be shorter than navigation_timeout_ms ({}ms)",
            config.network_idle_ms, config.navigation_timeout_ms
        )));
    }

    Ok(())
}

/// Validates the seed URL: absolute, http(s), with a host
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must use the http or https scheme",
            base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            base_url
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-empty, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if let Some(executable) = &config.executable {
        if executable.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "executable cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.log_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "log_dir cannot be empty".to_string(),
        ));
    }

    if config.screenshot_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "screenshot_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
