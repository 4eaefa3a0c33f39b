//! Fee-sponsored transaction relay for Stellar/Soroban.
//!
//! A sponsor account pays the fees for payments and contract invocations
//! authorized by other parties: the relay builds the envelope, dry-runs
//! invocations for resource fees, signs as the sponsor, submits and polls
//! until the transaction is final.

pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use ledger::{Confirmation, DecodedValue, RelayError, RelayResult, SignedEnvelope, SponsorKey};
pub use lifecycle::{CancelToken, Shutdown};
pub use relay::SponsoredRelay;
