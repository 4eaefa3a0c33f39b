//! Ledger pipeline for fee-sponsored transactions.
//!
//! # Data Flow
//! ```text
//! AccountSequencer ──► EnvelopeBuilder ──► [InvocationSimulator] ──► Signer
//!                                                                      │
//!          ResultDecoder ◄── ConfirmationPoller ◄── Submitter ◄────────┘
//! ```
//!
//! Every network call goes through [`client::LedgerGateway`].

pub mod address;
pub mod args;
pub mod balance;
pub mod client;
pub mod codec;
pub mod confirm;
pub mod decode;
pub mod envelope;
pub mod sequencer;
pub mod signer;
pub mod simulate;
pub mod types;
pub mod wallet;

pub use args::ContractArg;
pub use client::{LedgerGateway, RpcClient};
pub use confirm::{Confirmation, ConfirmationPoller, Sleeper, TokioSleeper};
pub use decode::DecodedValue;
pub use envelope::{AssetSpec, EnvelopeBuilder, OperationSpec, SignedEnvelope, UnsignedEnvelope};
pub use types::{
    AccountState, AssetBalance, NetworkId, RelayError, RelayResult, SimulationResult,
    SubmissionOutcome, TransactionStatus,
};
pub use wallet::SponsorKey;
