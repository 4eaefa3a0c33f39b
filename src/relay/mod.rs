//! Public relay facade.
//!
//! # Data Flow
//! ```text
//! build_*            → load sponsor → build → [simulate → assemble] → sign
//! submit_and_confirm → submit → poll → decode
//! pay/invoke_and_confirm → gate → build_* → submit_and_confirm
//! get_account_balance → load account → select balance
//! simulate_read_only_call → load sponsor → build → simulate → decode
//! ```
//!
//! # Design Decisions
//! - Each entry point runs inside a span carrying a fresh `request_id`
//! - The single-flight gate only covers the combined entry points; callers
//!   of the split build/submit API manage sequencing themselves

pub mod service;

pub use service::SponsoredRelay;
