//! StrKey address parsing and conversion to XDR account types.

use stellar_strkey::{ed25519, Contract};
use stellar_xdr::curr::{AccountId, ContractId, Hash, MuxedAccount, PublicKey, ScAddress, Uint256};

use crate::ledger::types::{RelayError, RelayResult};

/// Parse a `G...` account address into raw key bytes.
pub fn parse_account(address: &str) -> RelayResult<[u8; 32]> {
    ed25519::PublicKey::from_string(address)
        .map(|key| key.0)
        .map_err(|_| RelayError::InvalidInput(format!("Invalid account address '{}'", address)))
}

/// Parse a `C...` contract address into raw id bytes.
pub fn parse_contract(address: &str) -> RelayResult<[u8; 32]> {
    Contract::from_string(address)
        .map(|contract| contract.0)
        .map_err(|_| RelayError::InvalidInput(format!("Invalid contract address '{}'", address)))
}

pub fn account_id(address: &str) -> RelayResult<AccountId> {
    let key = parse_account(address)?;
    Ok(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key))))
}

pub fn muxed_account(address: &str) -> RelayResult<MuxedAccount> {
    let key = parse_account(address)?;
    Ok(MuxedAccount::Ed25519(Uint256(key)))
}

/// Account (`G...`) or contract (`C...`) address as an `ScAddress`.
pub fn sc_address(address: &str) -> RelayResult<ScAddress> {
    if address.starts_with('C') {
        Ok(ScAddress::Contract(ContractId(Hash(parse_contract(address)?))))
    } else {
        Ok(ScAddress::Account(account_id(address)?))
    }
}

pub fn encode_account(key: &[u8; 32]) -> String {
    ed25519::PublicKey(*key).to_string()
}

pub fn encode_contract(id: &[u8; 32]) -> String {
    Contract(*id).to_string()
}

/// StrKey text of an account id.
pub fn account_id_to_string(id: &AccountId) -> String {
    match &id.0 {
        PublicKey::PublicKeyTypeEd25519(Uint256(key)) => encode_account(key),
    }
}

/// StrKey text of a muxed account. Multiplexed ids are dropped.
pub fn muxed_to_string(account: &MuxedAccount) -> String {
    match account {
        MuxedAccount::Ed25519(Uint256(key)) => encode_account(key),
        MuxedAccount::MuxedEd25519(muxed) => encode_account(&muxed.ed25519.0),
    }
}

/// StrKey text of an account or contract address. Other address kinds
/// never appear in contract calls or return values this relay handles.
pub fn sc_address_to_string(address: &ScAddress) -> RelayResult<String> {
    match address {
        ScAddress::Account(id) => Ok(account_id_to_string(id)),
        ScAddress::Contract(ContractId(Hash(id))) => Ok(encode_contract(id)),
        other => Err(RelayError::DecodeError(format!(
            "Unsupported address kind {}",
            other.name()
        ))),
    }
}
