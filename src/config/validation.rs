use crate::config::types::{
    BackoffConfig, Config, DetailConfig, ListingConfig, ListingMode, OutputConfig,
    PolitenessConfig, RetryConfig, SessionConfig, SiteConfig,
};
use crate::extract::{Capture, Matcher};
use crate::session::Locator;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_listing_config(&config.listing)?;
    validate_detail_config(&config.detail)?;
    validate_retry_config(&config.retry)?;
    validate_politeness_config(&config.politeness)?;
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates site identity
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    validate_http_url(&config.base_url, "base-url")?;
    Ok(())
}

/// Validates listing configuration
fn validate_listing_config(config: &ListingConfig) -> Result<(), ConfigError> {
    match config.mode {
        ListingMode::Paged => {
            let template = config.url_template.as_deref().ok_or_else(|| {
                ConfigError::Validation("paged listing requires url-template".to_string())
            })?;

            if !template.contains("{page}") {
                return Err(ConfigError::Validation(format!(
                    "url-template must contain {{page}}, got '{}'",
                    template
                )));
            }

            let first_page = template.replace("{page}", &config.start_page.to_string());
            validate_http_url(&first_page, "url-template")?;
        }
        ListingMode::InfiniteScroll => {
            let url = config.url.as_deref().ok_or_else(|| {
                ConfigError::Validation("infinite-scroll listing requires url".to_string())
            })?;
            validate_http_url(url, "listing url")?;
        }
    }

    if config.max_iterations < 1 {
        return Err(ConfigError::Validation(
            "max-iterations must be >= 1".to_string(),
        ));
    }

    if config.max_consecutive_failures < 1 {
        return Err(ConfigError::Validation(
            "max-consecutive-failures must be >= 1".to_string(),
        ));
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation(
            "limit must be >= 1 when set".to_string(),
        ));
    }

    if config.links.is_empty() {
        return Err(ConfigError::Validation(
            "listing links chain cannot be empty".to_string(),
        ));
    }

    for matcher in &config.links {
        if !matches!(matcher.capture, Capture::Attr(_)) {
            return Err(ConfigError::Validation(format!(
                "listing link matcher '{}' must capture an attribute such as href",
                matcher.selector
            )));
        }
    }

    validate_chain(&config.links, "listing links")?;

    if let Some(marker) = &config.ready_marker {
        validate_locator(marker)?;
    }
    if let Some(control) = &config.load_more {
        validate_locator(control)?;
    }

    Ok(())
}

/// Validates detail extraction configuration
fn validate_detail_config(config: &DetailConfig) -> Result<(), ConfigError> {
    validate_locator(&config.ready_marker)?;

    if config.ready_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "ready-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.title.is_empty() {
        return Err(ConfigError::Validation(
            "detail title chain cannot be empty".to_string(),
        ));
    }

    if config.default_title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default-title cannot be empty".to_string(),
        ));
    }

    validate_chain(&config.title, "title")?;
    validate_chain(&config.description, "description")?;
    validate_chain(&config.image, "image")?;
    validate_chain(&config.content, "content")?;

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if let BackoffConfig::Uniform { min_ms, max_ms } = config.backoff {
        if max_ms < min_ms {
            return Err(ConfigError::Validation(format!(
                "backoff max-ms ({}) must be >= min-ms ({})",
                max_ms, min_ms
            )));
        }
    }

    Ok(())
}

/// Validates politeness delays
///
/// Values under the enforced floor are not rejected here; the pacer raises
/// them and logs a warning.
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.max_delay_ms < config.min_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= min-delay-ms ({})",
            config.max_delay_ms, config.min_delay_ms
        )));
    }
    Ok(())
}

/// Validates browser session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be > 0".to_string(),
        ));
    }

    if let Some(endpoint) = &config.render_endpoint {
        validate_http_url(endpoint, "render-endpoint")?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_path.is_none() && config.database_path.is_none() {
        return Err(ConfigError::Validation(
            "output needs json-path, database-path, or both".to_string(),
        ));
    }

    for (name, path) in [
        ("json-path", &config.json_path),
        ("database-path", &config.database_path),
    ] {
        if matches!(path.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.skip_existing && config.database_path.is_none() {
        return Err(ConfigError::Validation(
            "skip-existing requires database-path".to_string(),
        ));
    }

    Ok(())
}

/// Validates every selector in a fallback chain
fn validate_chain(chain: &[Matcher], field: &str) -> Result<(), ConfigError> {
    for matcher in chain {
        validate_selector(&matcher.selector).map_err(|e| match e {
            ConfigError::InvalidSelector(msg) => {
                ConfigError::InvalidSelector(format!("{} chain: {}", field, msg))
            }
            other => other,
        })?;

        if matcher.join == Some(0) {
            return Err(ConfigError::Validation(format!(
                "{} chain: join must be >= 1 for '{}'",
                field, matcher.selector
            )));
        }
    }
    Ok(())
}

fn validate_locator(locator: &Locator) -> Result<(), ConfigError> {
    validate_selector(&locator.selector)
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidUrl(format!(
            "{} must be http or https, got {}",
            field, scheme
        ))),
    }
}
