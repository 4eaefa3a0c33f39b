//! Ledger-facing types and error definitions.

use stellar_xdr::curr::{ScVal, SorobanAuthorizationEntry, SorobanTransactionData};
use thiserror::Error;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// Network identifier: SHA-256 of the network passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub [u8; 32]);

impl NetworkId {
    /// Derive the network id from its passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        use sha2::{Digest, Sha256};
        Self(Sha256::digest(passphrase.as_bytes()).into())
    }
}

impl From<[u8; 32]> for NetworkId {
    fn from(id: [u8; 32]) -> Self {
        Self(id)
    }
}

/// Errors that can occur anywhere in the sponsored transaction pipeline.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Read API or RPC endpoint could not be reached.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Account has never been funded.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Dry run reported an error for these arguments.
    #[error("Simulation failed: {reason}")]
    SimulationFailed { reason: String },

    /// Network refused the envelope before inclusion.
    #[error("Submission rejected for {hash}: {reason}")]
    SubmissionRejected { hash: String, reason: String },

    /// The ledger executed the transaction and it failed.
    #[error("Transaction {hash} failed on chain")]
    OnChainFailure {
        hash: String,
        result_xdr: Option<String>,
    },

    /// Status stayed unresolved for the whole poll budget.
    #[error("Transaction {hash} not confirmed after {attempts} status queries")]
    ConfirmationTimeout { hash: String, attempts: u32 },

    /// Caller abandoned the confirmation poll.
    #[error("Confirmation of {hash} cancelled")]
    Cancelled { hash: String },

    /// A network value could not be mapped to a host value.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Caller-supplied address, amount, asset or argument is malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// XDR encoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl RelayError {
    /// True when repeating the whole call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::NetworkUnavailable(_))
    }

    /// Transaction hash to reconcile against, when one is known.
    pub fn hash(&self) -> Option<&str> {
        match self {
            RelayError::SubmissionRejected { hash, .. }
            | RelayError::OnChainFailure { hash, .. }
            | RelayError::ConfirmationTimeout { hash, .. }
            | RelayError::Cancelled { hash } => Some(hash),
            _ => None,
        }
    }
}

impl From<stellar_xdr::curr::Error> for RelayError {
    fn from(e: stellar_xdr::curr::Error) -> Self {
        RelayError::Encoding(e.to_string())
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// One asset balance held by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBalance {
    /// `None` for the native asset.
    pub code: Option<String>,
    pub issuer: Option<String>,
    /// Fixed-point decimal string as reported by the read API.
    pub balance: String,
}

impl AssetBalance {
    pub fn is_native(&self) -> bool {
        self.code.is_none()
    }
}

/// Account snapshot loaded right before an envelope build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub address: String,
    /// Current on-ledger sequence number; the next envelope uses this + 1.
    pub sequence_number: i64,
    pub balances: Vec<AssetBalance>,
}

/// Successful dry run.
#[derive(Debug, Clone)]
pub struct SimulationSuccess {
    pub min_resource_fee: i64,
    pub transaction_data: SorobanTransactionData,
    pub auth_entries: Vec<SorobanAuthorizationEntry>,
    pub return_value: Option<ScVal>,
    pub latest_ledger: u32,
}

/// Outcome of a dry run.
#[derive(Debug, Clone)]
pub enum SimulationResult {
    Success(SimulationSuccess),
    Failure { message: String },
}

/// Immediate acknowledgment status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Accepted for inclusion (includes duplicates of an accepted envelope).
    Pending,
    /// Refused before inclusion.
    Rejected,
}

/// Acknowledgment of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub hash: String,
    pub status: SubmitStatus,
    pub latest_ledger: u32,
    /// Base64 `TransactionResult` explaining a rejection.
    pub error_result_xdr: Option<String>,
}

/// Ledger details attached to a terminal status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerOutcome {
    pub ledger: u32,
    pub close_time: u64,
    pub result_xdr: Option<String>,
    pub result_meta_xdr: Option<String>,
}

/// Transaction status as observed through the status API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    NotFound,
    Pending,
    Success(LedgerOutcome),
    Failed(LedgerOutcome),
}
