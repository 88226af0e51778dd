//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, addresses and value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    }

    check_http_url(&mut errors, "geoserver.base_url", &config.geoserver.base_url);
    check_http_url(&mut errors, "geoserver.rest_url", &config.geoserver.rest_url);
    check_http_url(&mut errors, "feed.endpoint", &config.feed.endpoint);

    if !config.geoserver.path_prefix.starts_with('/') {
        errors.push(ValidationError::new("geoserver.path_prefix", "must start with '/'"));
    } else if config.geoserver.path_prefix.trim_end_matches('/').is_empty() {
        errors.push(ValidationError::new("geoserver.path_prefix", "must name a path below '/'"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&config.retries.budget_ratio) {
        errors.push(ValidationError::new("retries.budget_ratio", "must be within [0, 1]"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push(ValidationError::new(field, "must be an http(s) URL with a host")),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.session.cookie_name = " ".into();
        config.feed.endpoint = "ftp://feeds.example".into();
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "session.cookie_name",
                "feed.endpoint",
                "retries.max_attempts",
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_geoserver_prefix_must_be_a_path() {
        let mut config = ProxyConfig::default();
        for prefix in ["geoserver/", "/", "//"] {
            config.geoserver.path_prefix = prefix.into();
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors[0].field, "geoserver.path_prefix");
        }

        config.geoserver.path_prefix = "/gs".into();
        assert!(validate_config(&config).is_ok());
    }
}
