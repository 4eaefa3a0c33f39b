//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the sponsored relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Endpoints and network identity.
    pub network: NetworkConfig,

    /// Where the sponsor credential comes from.
    pub sponsor: SponsorConfig,

    /// Envelope fee and validity settings.
    pub envelope: EnvelopeConfig,

    /// Confirmation polling.
    pub polling: PollingConfig,

    /// Retry configuration for account loads.
    pub retries: RetryConfig,

    /// Request serialization.
    pub relay: GateConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Account read API (Horizon) base URL.
    pub horizon_url: String,

    /// Soroban JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_rpc_urls: Vec<String>,

    /// Network passphrase; its hash scopes every signature.
    pub passphrase: String,

    /// Per-request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://horizon-testnet.stellar.org".to_string(),
            rpc_url: "https://soroban-testnet.stellar.org".to_string(),
            failover_rpc_urls: Vec::new(),
            passphrase: "Test SDF Network ; September 2015".to_string(),
            rpc_timeout_secs: 10,
        }
    }
}

/// Sponsor credential source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SponsorConfig {
    /// Environment variable holding the `S...` secret seed.
    pub secret_env_var: String,
}

impl Default for SponsorConfig {
    fn default() -> Self {
        Self {
            secret_env_var: crate::ledger::wallet::SPONSOR_SECRET_ENV_VAR.to_string(),
        }
    }
}

/// What to do with an issued asset code that has no issuer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetPolicy {
    /// Pay in the native asset instead (logged).
    #[default]
    FallbackToNative,
    /// Refuse the payment.
    Strict,
}

/// Envelope assembly settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Inclusion fee per operation in stroops.
    pub base_fee: u32,

    /// Seconds from build time until the envelope expires.
    pub validity_secs: u64,

    /// Missing-issuer handling.
    pub asset_policy: AssetPolicy,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            base_fee: 100,
            validity_secs: 30,
            asset_policy: AssetPolicy::FallbackToNative,
        }
    }
}

/// Confirmation polling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Wait between status queries in milliseconds (about one ledger close).
    pub interval_ms: u64,

    /// Maximum number of status queries.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            max_attempts: 12,
        }
    }
}

/// Retry configuration for transient account-load failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first (1 disables retries).
    pub account_load_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            account_load_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Sequence-consuming request serialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Allow only one sponsor-sourced submission in flight at a time.
    pub single_flight: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            single_flight: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
