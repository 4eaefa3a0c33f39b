//! Network-scoped transaction hashing and sponsor signing.
//!
//! The signed payload is the SHA-256 of the XDR-encoded
//! `TransactionSignaturePayload { network_id, Tx(tx) }`, so a signature
//! produced for one network never verifies on another.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, Limits, Transaction, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};

use crate::ledger::envelope::{SignedEnvelope, UnsignedEnvelope};
use crate::ledger::types::{NetworkId, RelayResult};
use crate::ledger::wallet::SponsorKey;

/// Hash of `tx` as identified on `network_id`.
pub fn transaction_hash(tx: &Transaction, network_id: &NetworkId) -> RelayResult<[u8; 32]> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network_id.0),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload.to_xdr(Limits::none())?;
    Ok(Sha256::digest(bytes).into())
}

/// Sign the final envelope with the sponsor key.
///
/// Consumes the unsigned envelope; nothing may change the transaction body
/// once a signature covers it.
pub fn sign(
    envelope: UnsignedEnvelope,
    sponsor: &SponsorKey,
    network_id: &NetworkId,
) -> RelayResult<SignedEnvelope> {
    let hash = envelope.hash(network_id)?;
    let signature = sponsor.sign_hash(&hash)?;

    tracing::debug!(
        sponsor = sponsor.address(),
        hash = %hex::encode(hash),
        "Envelope signed"
    );

    SignedEnvelope::new(envelope.into_transaction(), signature)
}
