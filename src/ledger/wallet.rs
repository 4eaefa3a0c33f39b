//! Sponsor credential management and payload signing.
//!
//! # Security
//! - The secret seed is loaded from an environment variable or passed in
//!   explicitly by the caller
//! - Keys are never logged or serialized

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use stellar_strkey::ed25519;
use stellar_xdr::curr::{BytesM, DecoratedSignature, Signature, SignatureHint};

use crate::ledger::address::encode_account;
use crate::ledger::types::{RelayError, RelayResult};

/// Default environment variable holding the sponsor's `S...` secret seed.
pub const SPONSOR_SECRET_ENV_VAR: &str = "RELAY_SPONSOR_SECRET";

/// The fee-paying account's signing key.
#[derive(Clone)]
pub struct SponsorKey {
    signing_key: SigningKey,
    address: String,
}

impl SponsorKey {
    /// Create a sponsor key from a StrKey secret seed (`S...`).
    pub fn from_secret(secret: &str) -> RelayResult<Self> {
        let seed = ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| RelayError::InvalidInput("Invalid sponsor secret seed".to_string()))?;
        let key = Self::from_seed(seed.0);

        tracing::info!(address = %key.address, "Sponsor key loaded");
        Ok(key)
    }

    /// Create a sponsor key from raw seed bytes.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = encode_account(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Load the sponsor key from the named environment variable.
    pub fn from_env(var: &str) -> RelayResult<Self> {
        let secret = std::env::var(var).map_err(|_| {
            RelayError::InvalidInput(format!("Environment variable {} not set", var))
        })?;
        Self::from_secret(&secret)
    }

    /// The sponsor's `G...` address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Last four bytes of the public key, as the network expects.
    pub fn hint(&self) -> SignatureHint {
        let public = self.public_key();
        SignatureHint([public[28], public[29], public[30], public[31]])
    }

    /// Sign a transaction hash and wrap it for the envelope.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> RelayResult<DecoratedSignature> {
        let signature = self.signing_key.sign(hash);
        let bytes: BytesM<64> = signature
            .to_bytes()
            .to_vec()
            .try_into()
            .map_err(|e| RelayError::Encoding(format!("Signature encoding failed: {}", e)))?;

        Ok(DecoratedSignature {
            hint: self.hint(),
            signature: Signature(bytes),
        })
    }

    /// Check a decorated signature against this key.
    pub fn verify(&self, hash: &[u8; 32], signature: &DecoratedSignature) -> bool {
        verify_signature(&self.public_key(), hash, signature)
    }
}

/// Verify an envelope signature against a raw ed25519 public key.
pub fn verify_signature(public: &[u8; 32], hash: &[u8; 32], signature: &DecoratedSignature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public) else {
        return false;
    };
    let Ok(raw) = <[u8; 64]>::try_from(signature.signature.0.as_slice()) else {
        return false;
    };
    key.verify(hash, &ed25519_dalek::Signature::from_bytes(&raw))
        .is_ok()
}

impl std::fmt::Debug for SponsorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SponsorKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
