//! Contract return value decoding.
//!
//! Maps an `ScVal` into [`DecodedValue`], a host-native tree the caller can
//! inspect or project onto JSON.
//!
//! # Design Decisions
//! - Integers that fit in `i64` become [`DecodedValue::Int`]; anything wider
//!   becomes [`DecodedValue::BigInt`] holding the exact decimal text. Values
//!   are never coerced to floating point.
//! - Text that is not valid UTF-8 is an error, not a lossy string.
//! - Host-internal values (errors, ledger keys, instances) have no host
//!   representation and fail to decode.

use alloy_primitives::{I256, U256};
use serde_json::Value;
use stellar_xdr::curr::{Int256Parts, ScVal, TransactionMeta, UInt256Parts};

use crate::ledger::address::sc_address_to_string;
use crate::ledger::codec::decode_xdr;
use crate::ledger::types::{RelayError, RelayResult};

/// A decoded contract value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Exact decimal text of an integer outside the `i64` range.
    BigInt(String),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<DecodedValue>),
    /// Entries in ledger order.
    Map(Vec<(DecodedValue, DecodedValue)>),
}

impl DecodedValue {
    /// Project onto JSON. Big integers stay strings, bytes become hex and
    /// maps become arrays of `[key, value]` pairs since keys need not be
    /// strings.
    pub fn to_json(&self) -> Value {
        match self {
            DecodedValue::Null => Value::Null,
            DecodedValue::Bool(b) => Value::Bool(*b),
            DecodedValue::Int(i) => Value::from(*i),
            DecodedValue::BigInt(s) | DecodedValue::String(s) => Value::String(s.clone()),
            DecodedValue::Bytes(bytes) => Value::String(hex::encode(bytes)),
            DecodedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            DecodedValue::Map(entries) => Value::Array(
                entries
                    .iter()
                    .map(|(k, v)| Value::Array(vec![k.to_json(), v.to_json()]))
                    .collect(),
            ),
        }
    }
}

fn unsigned(v: u128) -> DecodedValue {
    match i64::try_from(v) {
        Ok(i) => DecodedValue::Int(i),
        Err(_) => DecodedValue::BigInt(v.to_string()),
    }
}

fn signed(v: i128) -> DecodedValue {
    match i64::try_from(v) {
        Ok(i) => DecodedValue::Int(i),
        Err(_) => DecodedValue::BigInt(v.to_string()),
    }
}

fn utf8(kind: &str, raw: &[u8]) -> RelayResult<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| RelayError::DecodeError(format!("{} is not valid UTF-8", kind)))
}

fn decode_u256(parts: &UInt256Parts) -> DecodedValue {
    let value = U256::from_limbs([parts.lo_lo, parts.lo_hi, parts.hi_lo, parts.hi_hi]);
    match i64::try_from(value) {
        Ok(i) => DecodedValue::Int(i),
        Err(_) => DecodedValue::BigInt(value.to_string()),
    }
}

fn decode_i256(parts: &Int256Parts) -> DecodedValue {
    // Limbs are the two's complement bit pattern, least significant first.
    let raw = U256::from_limbs([parts.lo_lo, parts.lo_hi, parts.hi_lo, parts.hi_hi as u64]);
    let value = I256::from_raw(raw);
    match i64::try_from(value) {
        Ok(i) => DecodedValue::Int(i),
        Err(_) => DecodedValue::BigInt(value.to_string()),
    }
}

/// Decode one contract value.
pub fn decode(value: &ScVal) -> RelayResult<DecodedValue> {
    let decoded = match value {
        ScVal::Void => DecodedValue::Null,
        ScVal::Bool(b) => DecodedValue::Bool(*b),
        ScVal::U32(v) => DecodedValue::Int(i64::from(*v)),
        ScVal::I32(v) => DecodedValue::Int(i64::from(*v)),
        ScVal::I64(v) => DecodedValue::Int(*v),
        ScVal::U64(v) => unsigned(u128::from(*v)),
        ScVal::Timepoint(t) => unsigned(u128::from(t.0)),
        ScVal::Duration(d) => unsigned(u128::from(d.0)),
        ScVal::U128(parts) => unsigned((u128::from(parts.hi) << 64) | u128::from(parts.lo)),
        ScVal::I128(parts) => signed((i128::from(parts.hi) << 64) | i128::from(parts.lo)),
        ScVal::U256(parts) => decode_u256(parts),
        ScVal::I256(parts) => decode_i256(parts),
        ScVal::Bytes(bytes) => DecodedValue::Bytes(bytes.0.to_vec()),
        ScVal::String(s) => DecodedValue::String(utf8("String", s.0.as_slice())?),
        ScVal::Symbol(s) => DecodedValue::String(utf8("Symbol", s.0.as_slice())?),
        ScVal::Address(address) => DecodedValue::String(sc_address_to_string(address)?),
        ScVal::Vec(None) => DecodedValue::List(Vec::new()),
        ScVal::Vec(Some(items)) => DecodedValue::List(
            items
                .0
                .iter()
                .map(decode)
                .collect::<RelayResult<Vec<_>>>()?,
        ),
        ScVal::Map(None) => DecodedValue::Map(Vec::new()),
        ScVal::Map(Some(entries)) => DecodedValue::Map(
            entries
                .0
                .iter()
                .map(|entry| Ok((decode(&entry.key)?, decode(&entry.val)?)))
                .collect::<RelayResult<Vec<_>>>()?,
        ),
        ScVal::Error(e) => {
            return Err(RelayError::DecodeError(format!(
                "Contract returned an error value: {:?}",
                e
            )))
        }
        ScVal::LedgerKeyContractInstance | ScVal::LedgerKeyNonce(_) | ScVal::ContractInstance(_) => {
            return Err(RelayError::DecodeError(format!(
                "Unsupported value type {}",
                value.name()
            )))
        }
    };
    Ok(decoded)
}

/// Extract and decode the return value from a successful invocation's
/// base64 `TransactionMeta`. `None` when the meta carries no Soroban data.
pub fn decode_return_from_meta(result_meta_xdr: &str) -> RelayResult<Option<DecodedValue>> {
    match decode_xdr::<TransactionMeta>(result_meta_xdr)? {
        TransactionMeta::V3(meta) => meta
            .soroban_meta
            .as_ref()
            .map(|soroban| decode(&soroban.return_value))
            .transpose(),
        TransactionMeta::V4(meta) => meta
            .soroban_meta
            .as_ref()
            .and_then(|soroban| soroban.return_value.as_ref())
            .map(decode)
            .transpose(),
        _ => Ok(None),
    }
}
