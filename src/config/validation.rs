//! Configuration validation.
//!
//! Semantic checks on top of what serde guarantees syntactically. The
//! validator is a pure function and returns every violation it finds, not
//! just the first, so a bad deployment surfaces all problems at once.

use crate::config::schema::FleetConfig;

/// A single semantic violation found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &FleetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.access_secret.is_empty() {
        errors.push(ValidationError::new(
            "auth.access_secret",
            "must not be empty (set FLEET_ACCESS_SECRET or the config file)",
        ));
    }
    if config.auth.refresh_secret.is_empty() {
        errors.push(ValidationError::new(
            "auth.refresh_secret",
            "must not be empty (set FLEET_REFRESH_SECRET or the config file)",
        ));
    }
    if !config.auth.access_secret.is_empty()
        && config.auth.access_secret == config.auth.refresh_secret
    {
        errors.push(ValidationError::new(
            "auth.refresh_secret",
            "must differ from access_secret so token kinds are not interchangeable",
        ));
    }
    if config.auth.access_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.access_ttl_secs", "must be > 0"));
    }
    if config.auth.refresh_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.refresh_ttl_secs", "must be > 0"));
    }
    if config.auth.session_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.session_ttl_secs", "must be > 0"));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
    }
    if config.rate_limit.auth.window_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.auth.window_secs",
            "must be > 0",
        ));
    }
    if config.rate_limit.auth.max_requests == 0 {
        errors.push(ValidationError::new(
            "rate_limit.auth.max_requests",
            "must be > 0",
        ));
    }

    if let Some(url) = &config.broker.url {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new("broker.url", "is not a valid URL"));
        }
    }
    if config.broker.op_timeout_ms == 0 {
        errors.push(ValidationError::new("broker.op_timeout_ms", "must be > 0"));
    }

    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            "is not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
