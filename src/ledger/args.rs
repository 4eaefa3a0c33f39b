//! Typed contract-call arguments.
//!
//! Callers describe arguments as tagged JSON, e.g.
//! `{"type": "u32", "value": 5}` or `{"type": "address", "value": "G..."}`,
//! and they are converted to `ScVal` before the envelope is built.

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    Int128Parts, ScBytes, ScMap, ScMapEntry, ScString, ScSymbol, ScVal, ScVec, UInt128Parts,
};

use crate::ledger::address::sc_address;
use crate::ledger::types::{RelayError, RelayResult};

/// One host-side argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContractArg {
    Void,
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    /// Decimal string; JSON numbers cannot carry the full range.
    U128(String),
    /// Decimal string; JSON numbers cannot carry the full range.
    I128(String),
    Symbol(String),
    String(String),
    /// Hex-encoded bytes.
    Bytes(String),
    /// `G...` account or `C...` contract.
    Address(String),
    Vec(Vec<ContractArg>),
    /// Key/value pairs; sorted by key on conversion.
    Map(Vec<(ContractArg, ContractArg)>),
}

fn invalid(what: &str, e: impl std::fmt::Display) -> RelayError {
    RelayError::InvalidInput(format!("Invalid {} argument: {}", what, e))
}

/// Validate and convert a symbol (up to 32 chars of `[A-Za-z0-9_]`).
pub fn symbol(name: &str) -> RelayResult<ScSymbol> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("symbol", format!("'{}' is not a valid symbol", name)));
    }
    Ok(ScSymbol(name.try_into().map_err(|e| invalid("symbol", e))?))
}

impl ContractArg {
    /// Parse one argument from its JSON form.
    pub fn from_json(text: &str) -> RelayResult<Self> {
        serde_json::from_str(text).map_err(|e| invalid("JSON", e))
    }

    pub fn to_sc_val(&self) -> RelayResult<ScVal> {
        let value = match self {
            ContractArg::Void => ScVal::Void,
            ContractArg::Bool(b) => ScVal::Bool(*b),
            ContractArg::U32(v) => ScVal::U32(*v),
            ContractArg::I32(v) => ScVal::I32(*v),
            ContractArg::U64(v) => ScVal::U64(*v),
            ContractArg::I64(v) => ScVal::I64(*v),
            ContractArg::U128(text) => {
                let v: u128 = text.trim().parse().map_err(|e| invalid("u128", e))?;
                ScVal::U128(UInt128Parts {
                    hi: (v >> 64) as u64,
                    lo: v as u64,
                })
            }
            ContractArg::I128(text) => {
                let v: i128 = text.trim().parse().map_err(|e| invalid("i128", e))?;
                ScVal::I128(Int128Parts {
                    hi: (v >> 64) as i64,
                    lo: v as u64,
                })
            }
            ContractArg::Symbol(s) => ScVal::Symbol(symbol(s)?),
            ContractArg::String(s) => {
                ScVal::String(ScString(s.as_str().try_into().map_err(|e| invalid("string", e))?))
            }
            ContractArg::Bytes(text) => {
                let raw = hex::decode(text.trim_start_matches("0x")).map_err(|e| invalid("bytes", e))?;
                ScVal::Bytes(ScBytes(raw.try_into().map_err(|e| invalid("bytes", e))?))
            }
            ContractArg::Address(text) => ScVal::Address(sc_address(text)?),
            ContractArg::Vec(items) => {
                let values = items
                    .iter()
                    .map(ContractArg::to_sc_val)
                    .collect::<RelayResult<Vec<_>>>()?;
                ScVal::Vec(Some(ScVec(values.try_into().map_err(|e| invalid("vec", e))?)))
            }
            ContractArg::Map(pairs) => {
                let mut entries = pairs
                    .iter()
                    .map(|(k, v)| {
                        Ok(ScMapEntry {
                            key: k.to_sc_val()?,
                            val: v.to_sc_val()?,
                        })
                    })
                    .collect::<RelayResult<Vec<_>>>()?;
                // The host rejects maps that are unsorted or have duplicate keys.
                entries.sort_by(|a, b| a.key.cmp(&b.key));
                if entries.windows(2).any(|w| w[0].key == w[1].key) {
                    return Err(invalid("map", "duplicate key"));
                }
                ScVal::Map(Some(ScMap(entries.try_into().map_err(|e| invalid("map", e))?)))
            }
        };
        Ok(value)
    }
}

/// Convert a whole argument list.
pub fn to_sc_vals(args: &[ContractArg]) -> RelayResult<Vec<ScVal>> {
    args.iter().map(ContractArg::to_sc_val).collect()
}
