//! Network gateway: account reads, dry runs, submission and status queries.
//!
//! # Responsibilities
//! - Define the [`LedgerGateway`] seam the pipeline talks through
//! - Query the account read API (Horizon) for sequence and balances
//! - Call Soroban JSON-RPC `simulateTransaction`, `sendTransaction`,
//!   `getTransaction`
//! - Fail over across RPC endpoints on transport errors, with a timeout on
//!   every request

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use stellar_xdr::curr::{ScVal, SorobanAuthorizationEntry, SorobanTransactionData};

use crate::ledger::address::parse_account;
use crate::ledger::codec::decode_xdr;
use crate::ledger::types::{
    AccountState, AssetBalance, LedgerOutcome, NetworkConfig, RelayError, RelayResult,
    SimulationResult, SimulationSuccess, SubmissionOutcome, SubmitStatus, TransactionStatus,
};
use crate::resilience::timeouts::with_timeout;

/// Everything the pipeline needs from the network.
///
/// Envelopes cross this boundary as base64 XDR, exactly as they go on the
/// wire.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Load an account's sequence number and balances.
    async fn load_account(&self, address: &str) -> RelayResult<AccountState>;

    /// Dry-run an unsigned envelope.
    async fn simulate(&self, envelope_xdr: &str) -> RelayResult<SimulationResult>;

    /// Submit a signed envelope for inclusion.
    async fn submit(&self, envelope_xdr: &str) -> RelayResult<SubmissionOutcome>;

    /// Query the status of a submitted transaction by hash.
    async fn transaction_status(&self, hash: &str) -> RelayResult<TransactionStatus>;
}

/// Production gateway over Horizon and Soroban RPC.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    horizon_url: url::Url,
    /// Primary RPC endpoint followed by failovers.
    rpc_urls: Vec<url::Url>,
    timeout_duration: Duration,
}

impl RpcClient {
    /// Create a new gateway client.
    pub fn new(config: &NetworkConfig) -> RelayResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);

        let horizon_url = horizon_base(&config.horizon_url)?;

        let mut rpc_urls = Vec::new();
        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            RelayError::InvalidInput(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        rpc_urls.push(primary);

        for url_str in &config.failover_rpc_urls {
            match url_str.parse() {
                Ok(url) => rpc_urls.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let http = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(|e| RelayError::NetworkUnavailable(format!("HTTP client setup failed: {}", e)))?;

        tracing::info!(
            horizon_url = %horizon_url,
            rpc_url = %config.rpc_url,
            failovers = rpc_urls.len() - 1,
            "Ledger gateway initialized"
        );

        Ok(Self {
            http,
            horizon_url,
            rpc_urls,
            timeout_duration,
        })
    }

    /// Check whether the primary RPC answers `getHealth`.
    pub async fn is_healthy(&self) -> bool {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }
        match self.rpc_call::<Health>("getHealth", json!({})).await {
            Ok(health) => health.status == "healthy",
            Err(e) => {
                tracing::warn!(error = %e, "RPC health check failed");
                false
            }
        }
    }

    /// Issue a JSON-RPC call, trying each endpoint in order.
    ///
    /// Transport failures move on to the next endpoint. A JSON-RPC error
    /// object is an answer, not an outage, and is returned immediately.
    async fn rpc_call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcFailure> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        for (i, url) in self.rpc_urls.iter().enumerate() {
            let request = async {
                let response = self
                    .http
                    .post(url.clone())
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?
                    .error_for_status()
                    .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?;
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?;
                serde_json::from_slice::<JsonRpcResponse<T>>(&body)
                    .map_err(|e| RelayError::DecodeError(format!("Malformed RPC response: {}", e)))
            };

            match with_timeout(method, self.timeout_duration, request).await {
                Ok(JsonRpcResponse {
                    result: Some(result),
                    ..
                }) => return Ok(result),
                Ok(JsonRpcResponse {
                    error: Some(error), ..
                }) => {
                    return Err(RpcFailure::Rejected(format!(
                        "rpc error {}: {}",
                        error.code, error.message
                    )))
                }
                Ok(_) => {
                    return Err(RpcFailure::Rejected(
                        "rpc returned neither result nor error".to_string(),
                    ))
                }
                Err(RelayError::DecodeError(msg)) => {
                    tracing::warn!(provider_idx = i, method = method, error = %msg, "Undecodable RPC response");
                    return Err(RpcFailure::Malformed(msg));
                }
                Err(e) => {
                    tracing::warn!(provider_idx = i, method = method, error = %e, "RPC error, trying next provider");
                }
            }
        }

        Err(RpcFailure::Unavailable(format!(
            "All RPC providers failed for {}",
            method
        )))
    }
}

/// Parse the Horizon base so relative joins append to its path.
fn horizon_base(raw: &str) -> RelayResult<url::Url> {
    let mut url: url::Url = raw
        .parse()
        .map_err(|e| RelayError::InvalidInput(format!("Invalid Horizon URL '{}': {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Why a JSON-RPC call produced no result.
#[derive(Debug, thiserror::Error)]
enum RpcFailure {
    /// No endpoint could be reached.
    #[error("{0}")]
    Unavailable(String),
    /// The endpoint answered with an error object.
    #[error("{0}")]
    Rejected(String),
    /// The endpoint answered with a body that is not a JSON-RPC response.
    #[error("{0}")]
    Malformed(String),
}

impl RpcFailure {
    fn into_relay_error(self) -> RelayError {
        match self {
            RpcFailure::Unavailable(msg) | RpcFailure::Rejected(msg) => {
                RelayError::NetworkUnavailable(msg)
            }
            RpcFailure::Malformed(msg) => RelayError::DecodeError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct HorizonAccount {
    id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<HorizonBalance>,
}

#[derive(Debug, Deserialize)]
struct HorizonBalance {
    balance: String,
    asset_type: String,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    error: Option<String>,
    transaction_data: Option<String>,
    min_resource_fee: Option<String>,
    results: Option<Vec<SimulateHostFunctionResult>>,
    #[serde(default)]
    latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
struct SimulateHostFunctionResult {
    auth: Option<Vec<String>>,
    xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    status: String,
    hash: String,
    #[serde(default)]
    latest_ledger: u32,
    error_result_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionResponse {
    status: String,
    ledger: Option<u32>,
    created_at: Option<Value>,
    result_xdr: Option<String>,
    result_meta_xdr: Option<String>,
}

fn account_from_horizon(raw: HorizonAccount) -> RelayResult<AccountState> {
    let sequence_number = raw.sequence.parse::<i64>().map_err(|e| {
        RelayError::DecodeError(format!("Invalid sequence number '{}': {}", raw.sequence, e))
    })?;

    let balances = raw
        .balances
        .into_iter()
        .filter_map(|b| match b.asset_type.as_str() {
            "native" => Some(AssetBalance {
                code: None,
                issuer: None,
                balance: b.balance,
            }),
            // Liquidity pool shares carry no asset code.
            _ => b.asset_code.map(|code| AssetBalance {
                code: Some(code),
                issuer: b.asset_issuer,
                balance: b.balance,
            }),
        })
        .collect();

    Ok(AccountState {
        address: raw.id,
        sequence_number,
        balances,
    })
}

fn parse_simulation(raw: SimulateResponse) -> RelayResult<SimulationResult> {
    if let Some(message) = raw.error {
        return Ok(SimulationResult::Failure { message });
    }

    let transaction_data: SorobanTransactionData = raw
        .transaction_data
        .as_deref()
        .ok_or_else(|| RelayError::DecodeError("Simulation returned no transactionData".to_string()))
        .and_then(decode_xdr)?;

    let min_resource_fee = raw
        .min_resource_fee
        .as_deref()
        .unwrap_or("0")
        .parse::<i64>()
        .map_err(|e| RelayError::DecodeError(format!("Invalid minResourceFee: {}", e)))?;

    let first = raw.results.unwrap_or_default().into_iter().next();
    let (auth_entries, return_value) = match first {
        Some(result) => {
            let auth = result
                .auth
                .unwrap_or_default()
                .iter()
                .map(|entry| decode_xdr::<SorobanAuthorizationEntry>(entry))
                .collect::<RelayResult<Vec<_>>>()?;
            (auth, Some(decode_xdr::<ScVal>(&result.xdr)?))
        }
        None => (Vec::new(), None),
    };

    Ok(SimulationResult::Success(SimulationSuccess {
        min_resource_fee,
        transaction_data,
        auth_entries,
        return_value,
        latest_ledger: raw.latest_ledger,
    }))
}

fn parse_submission(raw: SendResponse) -> SubmissionOutcome {
    // TRY_AGAIN_LATER means the envelope was not accepted into the queue;
    // treating it as pending would poll for a transaction that never lands.
    let status = match raw.status.as_str() {
        "PENDING" | "DUPLICATE" => SubmitStatus::Pending,
        _ => SubmitStatus::Rejected,
    };

    SubmissionOutcome {
        hash: raw.hash,
        status,
        latest_ledger: raw.latest_ledger,
        error_result_xdr: raw.error_result_xdr,
    }
}

fn parse_status(raw: GetTransactionResponse) -> TransactionStatus {
    let close_time = match &raw.created_at {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => 0,
    };
    let outcome = LedgerOutcome {
        ledger: raw.ledger.unwrap_or_default(),
        close_time,
        result_xdr: raw.result_xdr,
        result_meta_xdr: raw.result_meta_xdr,
    };

    match raw.status.as_str() {
        "SUCCESS" => TransactionStatus::Success(outcome),
        "FAILED" => TransactionStatus::Failed(outcome),
        "NOT_FOUND" => TransactionStatus::NotFound,
        other => {
            tracing::debug!(status = other, "Unrecognized transaction status, treating as pending");
            TransactionStatus::Pending
        }
    }
}

#[async_trait]
impl LedgerGateway for RpcClient {
    async fn load_account(&self, address: &str) -> RelayResult<AccountState> {
        parse_account(address)?;
        let url = self
            .horizon_url
            .join(&format!("accounts/{}", address))
            .map_err(|e| RelayError::InvalidInput(format!("Invalid account path: {}", e)))?;

        let request = async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(RelayError::AccountNotFound(address.to_string()));
            }
            let response = response
                .error_for_status()
                .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?;

            let body = response
                .bytes()
                .await
                .map_err(|e| RelayError::NetworkUnavailable(e.to_string()))?;
            serde_json::from_slice::<HorizonAccount>(&body)
                .map_err(|e| RelayError::DecodeError(format!("Malformed account response: {}", e)))
        };

        let raw = with_timeout("load_account", self.timeout_duration, request).await?;
        account_from_horizon(raw)
    }

    async fn simulate(&self, envelope_xdr: &str) -> RelayResult<SimulationResult> {
        let raw: SimulateResponse = self
            .rpc_call("simulateTransaction", json!({ "transaction": envelope_xdr }))
            .await
            .map_err(|failure| match failure {
                RpcFailure::Rejected(reason) => RelayError::SimulationFailed { reason },
                other => other.into_relay_error(),
            })?;
        parse_simulation(raw)
    }

    async fn submit(&self, envelope_xdr: &str) -> RelayResult<SubmissionOutcome> {
        let raw: SendResponse = self
            .rpc_call("sendTransaction", json!({ "transaction": envelope_xdr }))
            .await
            .map_err(|failure| match failure {
                // The caller fills in the locally computed hash.
                RpcFailure::Rejected(reason) => RelayError::SubmissionRejected {
                    hash: String::new(),
                    reason,
                },
                other => other.into_relay_error(),
            })?;
        Ok(parse_submission(raw))
    }

    async fn transaction_status(&self, hash: &str) -> RelayResult<TransactionStatus> {
        let raw: GetTransactionResponse = self
            .rpc_call("getTransaction", json!({ "hash": hash }))
            .await
            .map_err(RpcFailure::into_relay_error)?;
        Ok(parse_status(raw))
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("horizon_url", &self.horizon_url.as_str())
            .field("rpc_urls", &self.rpc_urls.len())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
