//! Sponsor account loading.
//!
//! The sequence number is read fresh for every build and never cached:
//! a reused value goes stale as soon as any other envelope from the same
//! sponsor lands, and the network rejects the next submission.

use std::sync::Arc;

use crate::config::schema::RetryConfig;
use crate::ledger::client::LedgerGateway;
use crate::ledger::types::{AccountState, RelayResult};
use crate::resilience::backoff::Backoff;
use crate::resilience::retries::retry_transient;

/// Loads account state through the gateway.
pub struct AccountSequencer<G: ?Sized> {
    gateway: Arc<G>,
    sponsor_address: String,
    max_attempts: u32,
    backoff: Backoff,
}

impl<G: LedgerGateway + ?Sized> AccountSequencer<G> {
    pub fn new(gateway: Arc<G>, sponsor_address: impl Into<String>, retries: &RetryConfig) -> Self {
        Self {
            gateway,
            sponsor_address: sponsor_address.into(),
            max_attempts: retries.account_load_attempts,
            backoff: Backoff::from(retries),
        }
    }

    /// Load the sponsor's current account state.
    pub async fn load_sponsor_account(&self) -> RelayResult<AccountState> {
        let account = self.load_account(&self.sponsor_address).await?;
        tracing::debug!(
            sponsor = %account.address,
            sequence = account.sequence_number,
            "Sponsor account loaded"
        );
        Ok(account)
    }

    /// Load any account. Transport failures are retried within the
    /// configured budget; `AccountNotFound` is returned at once.
    pub async fn load_account(&self, address: &str) -> RelayResult<AccountState> {
        retry_transient("load_account", self.max_attempts, self.backoff, || {
            self.gateway.load_account(address)
        })
        .await
    }
}
