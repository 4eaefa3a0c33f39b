//! Timeout enforcement.
//!
//! Every gateway request is wrapped in a deadline; expiry surfaces as
//! `NetworkUnavailable` so callers treat it like any other transport failure.

use std::future::Future;
use std::time::Duration;

use crate::ledger::types::{RelayError, RelayResult};

/// Await `fut`, failing with `NetworkUnavailable` once `limit` elapses.
pub async fn with_timeout<T, Fut>(what: &str, limit: Duration, fut: Fut) -> RelayResult<T>
where
    Fut: Future<Output = RelayResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::NetworkUnavailable(format!(
            "{} timed out after {} ms",
            what,
            limit.as_millis()
        ))),
    }
}
