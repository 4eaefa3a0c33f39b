//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → logging.rs (structured log events, per-call request_id span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Transaction hashes are always logged; they are the reconciliation key
//! - Secrets are never logged
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
