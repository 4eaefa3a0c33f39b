//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Network call:
//!     → timeouts.rs (every gateway request has a deadline)
//!     → On transient failure: retries.rs (account loads only, bounded)
//!     → backoff.rs (delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only `NetworkUnavailable` is retried, and only for reads
//! - Submissions are never retried here: a resend could double-spend the
//!   sequence number or mask an on-chain outcome

pub mod backoff;
pub mod retries;
pub mod timeouts;
