//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Init logging/metrics → Load sponsor key → Build relay
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every CancelToken observes cancellation → polls stop
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Cancellation is level-triggered: tokens created after the trigger are
//!   already cancelled
//! - Cancelling stops waiting, not the transaction; the hash is reported

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{CancelToken, Shutdown};
