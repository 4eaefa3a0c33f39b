//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint URLs parse
//! - Validate value ranges (timeouts > 0, fee > 0, poll budget > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::RelayConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let urls = [
        ("network.horizon_url", &config.network.horizon_url),
        ("network.rpc_url", &config.network.rpc_url),
    ];
    for (field, value) in urls {
        if let Err(e) = value.parse::<url::Url>() {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
        }
    }
    for value in &config.network.failover_rpc_urls {
        if let Err(e) = value.parse::<url::Url>() {
            errors.push(ValidationError::new(
                "network.failover_rpc_urls",
                format!("invalid URL '{}': {}", value, e),
            ));
        }
    }

    if config.network.passphrase.trim().is_empty() {
        errors.push(ValidationError::new("network.passphrase", "must not be empty"));
    }
    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.sponsor.secret_env_var.trim().is_empty() {
        errors.push(ValidationError::new("sponsor.secret_env_var", "must not be empty"));
    }
    if config.envelope.base_fee == 0 {
        errors.push(ValidationError::new("envelope.base_fee", "must be greater than 0"));
    }
    if config.envelope.validity_secs == 0 {
        errors.push(ValidationError::new("envelope.validity_secs", "must be greater than 0"));
    }
    if config.polling.max_attempts == 0 {
        errors.push(ValidationError::new("polling.max_attempts", "must be greater than 0"));
    }
    if config.retries.account_load_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.account_load_attempts",
            "must be at least 1",
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
