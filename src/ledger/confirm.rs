//! Submission and confirmation polling.
//!
//! # Data Flow
//! ```text
//! SignedEnvelope ──► submit ──┬── Rejected ──► SubmissionRejected (no polls)
//!                             │
//!                             └── Pending ──► status query ◄──┐
//!                                                 │           │
//!                                   NotFound/Pending ── sleep ┘  (≤ max_attempts)
//!                                                 │
//!                             Success ──► Confirmation
//!                             Failed  ──► OnChainFailure
//! ```
//!
//! # Design Decisions
//! - The wait between polls goes through [`Sleeper`] so tests run without
//!   wall-clock delay
//! - Every query counts against the budget, including ones that fail in
//!   transport
//! - Cancellation is observed both while querying and while sleeping

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::schema::PollingConfig;
use crate::ledger::client::LedgerGateway;
use crate::ledger::decode::{decode_return_from_meta, DecodedValue};
use crate::ledger::envelope::SignedEnvelope;
use crate::ledger::types::{
    LedgerOutcome, NetworkId, RelayError, RelayResult, SubmitStatus, TransactionStatus,
};
use crate::lifecycle::shutdown::CancelToken;
use crate::observability::metrics::{record_confirmation_latency, record_status_poll, record_submission};

/// Waits between status queries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A transaction observed as successfully applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub hash: String,
    pub ledger: u32,
    pub close_time: u64,
    /// Decoded contract return value; `None` for classic operations.
    pub return_value: Option<DecodedValue>,
    /// Set when the result meta could not be decoded. The transaction still
    /// succeeded; only the return value is unknown.
    pub return_value_error: Option<String>,
}

impl Confirmation {
    fn from_outcome(hash: String, outcome: &LedgerOutcome) -> Self {
        let decoded = match outcome.result_meta_xdr.as_deref() {
            Some(meta) => decode_return_from_meta(meta),
            None => Ok(None),
        };
        let (return_value, return_value_error) = match decoded {
            Ok(value) => (value, None),
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "Return value unreadable for confirmed transaction");
                (None, Some(e.to_string()))
            }
        };
        Self {
            hash,
            ledger: outcome.ledger,
            close_time: outcome.close_time,
            return_value,
            return_value_error,
        }
    }
}

/// Submits signed envelopes and follows them to a terminal status.
pub struct ConfirmationPoller<G: ?Sized> {
    gateway: Arc<G>,
    sleeper: Arc<dyn Sleeper>,
    network_id: NetworkId,
    interval: Duration,
    max_attempts: u32,
}

impl<G: LedgerGateway + ?Sized> ConfirmationPoller<G> {
    pub fn new(gateway: Arc<G>, network_id: NetworkId, polling: &PollingConfig) -> Self {
        Self::with_sleeper(gateway, network_id, polling, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        gateway: Arc<G>,
        network_id: NetworkId,
        polling: &PollingConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            gateway,
            sleeper,
            network_id,
            interval: Duration::from_millis(polling.interval_ms),
            max_attempts: polling.max_attempts,
        }
    }

    /// Submit `envelope` and wait for it to reach a terminal status.
    pub async fn submit_and_confirm(
        &self,
        envelope: &SignedEnvelope,
        cancel: CancelToken,
    ) -> RelayResult<Confirmation> {
        let hash = self.submit(envelope).await?;
        let started = Instant::now();

        let result = self.poll(&hash, cancel).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(RelayError::OnChainFailure { .. }) => "failed",
            Err(RelayError::ConfirmationTimeout { .. }) => "timeout",
            Err(RelayError::Cancelled { .. }) => "cancelled",
            Err(_) => "error",
        };
        record_confirmation_latency(started.elapsed(), outcome);
        result
    }

    /// Submit only. Returns the hash to poll with.
    pub async fn submit(&self, envelope: &SignedEnvelope) -> RelayResult<String> {
        let local_hash = envelope.hash_hex(&self.network_id)?;
        let encoded = envelope.to_xdr_base64()?;

        let outcome = match self.gateway.submit(&encoded).await {
            Ok(outcome) => outcome,
            Err(RelayError::SubmissionRejected { hash, reason }) => {
                record_submission("rejected");
                let hash = if hash.is_empty() { local_hash } else { hash };
                tracing::warn!(hash = %hash, reason = %reason, "Submission rejected");
                return Err(RelayError::SubmissionRejected { hash, reason });
            }
            Err(e) => {
                record_submission("error");
                return Err(e);
            }
        };

        let hash = if outcome.hash.is_empty() {
            local_hash
        } else {
            if outcome.hash != local_hash {
                tracing::warn!(
                    local = %local_hash,
                    remote = %outcome.hash,
                    "Submission hash differs from locally computed hash"
                );
            }
            outcome.hash
        };

        match outcome.status {
            SubmitStatus::Pending => {
                record_submission("pending");
                tracing::info!(hash = %hash, latest_ledger = outcome.latest_ledger, "Transaction submitted");
                Ok(hash)
            }
            SubmitStatus::Rejected => {
                record_submission("rejected");
                let reason = outcome
                    .error_result_xdr
                    .unwrap_or_else(|| "rejected without a result".to_string());
                tracing::warn!(hash = %hash, reason = %reason, "Submission rejected");
                Err(RelayError::SubmissionRejected { hash, reason })
            }
        }
    }

    /// Query status until terminal, cancelled, or out of attempts.
    pub async fn poll(&self, hash: &str, mut cancel: CancelToken) -> RelayResult<Confirmation> {
        let cancelled = || RelayError::Cancelled {
            hash: hash.to_string(),
        };

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                status = self.gateway.transaction_status(hash) => status,
            };
            record_status_poll();

            match status {
                Ok(TransactionStatus::Success(outcome)) => {
                    tracing::info!(hash = %hash, ledger = outcome.ledger, attempts = attempt, "Transaction confirmed");
                    return Ok(Confirmation::from_outcome(hash.to_string(), &outcome));
                }
                Ok(TransactionStatus::Failed(outcome)) => {
                    tracing::warn!(hash = %hash, ledger = outcome.ledger, "Transaction failed on ledger");
                    return Err(RelayError::OnChainFailure {
                        hash: hash.to_string(),
                        result_xdr: outcome.result_xdr,
                    });
                }
                Ok(status) => {
                    tracing::debug!(hash = %hash, attempt = attempt, status = ?status, "Transaction not yet final");
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(hash = %hash, attempt = attempt, error = %e, "Status query failed");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(cancelled()),
                    _ = self.sleeper.sleep(self.interval) => {}
                }
            }
        }

        tracing::warn!(hash = %hash, attempts = self.max_attempts, "Confirmation budget exhausted");
        Err(RelayError::ConfirmationTimeout {
            hash: hash.to_string(),
            attempts: self.max_attempts,
        })
    }
}
