//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration (file or defaults)
//! - Initialize logging and, when enabled, the metrics exporter
//! - Read the sponsor credential and construct the production relay
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The sponsor secret comes from the environment, never from the file

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::RelayConfig;
use crate::config::validation::validate_config;
use crate::ledger::client::RpcClient;
use crate::ledger::types::RelayError;
use crate::ledger::wallet::SponsorKey;
use crate::observability::logging::init_logging;
use crate::observability::metrics::init_metrics;
use crate::relay::SponsoredRelay;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("Invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Load configuration from `path`, or validated defaults when absent.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let config = RelayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Initialize logging and metrics according to `config`.
pub fn init_observability(config: &RelayConfig) -> Result<(), StartupError> {
    init_logging(&config.observability);

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        init_metrics(addr);
    }
    Ok(())
}

/// Construct the production gateway.
pub fn build_gateway(config: &RelayConfig) -> Result<Arc<RpcClient>, StartupError> {
    Ok(Arc::new(RpcClient::new(&config.network)?))
}

/// Read the sponsor key from the configured environment variable and build
/// the relay over `gateway`.
pub fn build_relay(
    config: &RelayConfig,
    gateway: Arc<RpcClient>,
) -> Result<SponsoredRelay<RpcClient>, StartupError> {
    let sponsor = SponsorKey::from_env(&config.sponsor.secret_env_var)?;
    Ok(SponsoredRelay::new(config, sponsor, gateway))
}
