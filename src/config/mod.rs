//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → passed by value into SponsoredRelay at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The sponsor secret never lives in the file; only the name of the
//!   environment variable that holds it

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AssetPolicy;
pub use schema::EnvelopeConfig;
pub use schema::NetworkConfig;
pub use schema::PollingConfig;
pub use schema::RelayConfig;
