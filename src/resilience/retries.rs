//! Bounded retry of transient failures.
//!
//! # Design Decisions
//! - Fixed attempt ceiling; never loops unboundedly
//! - Only errors reporting `is_transient()` are retried
//! - Permanent errors (e.g. `AccountNotFound`) return immediately

use std::future::Future;

use crate::ledger::types::RelayResult;
use crate::resilience::backoff::Backoff;

/// Run `op` up to `max_attempts` times while it fails transiently.
pub async fn retry_transient<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    backoff: Backoff,
    mut op: F,
) -> RelayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = backoff.delay(attempt);
                tracing::warn!(
                    operation = what,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
