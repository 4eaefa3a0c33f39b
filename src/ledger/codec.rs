//! Base64-framed XDR encoding.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use stellar_xdr::curr::{Limits, ReadXdr, WriteXdr};

use crate::ledger::types::{RelayError, RelayResult};

/// Encode a value as canonical XDR, base64 framed.
pub fn encode_xdr<T: WriteXdr>(value: &T) -> RelayResult<String> {
    let bytes = value.to_xdr(Limits::none())?;
    Ok(BASE64_STANDARD.encode(bytes))
}

/// Decode a base64-framed XDR value received from the network.
pub fn decode_xdr<T: ReadXdr>(encoded: &str) -> RelayResult<T> {
    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| RelayError::DecodeError(format!("Invalid base64: {}", e)))?;
    T::from_xdr(bytes, Limits::none())
        .map_err(|e| RelayError::DecodeError(format!("Invalid XDR: {}", e)))
}
