//! Balance selection from a loaded account.

use crate::ledger::envelope::is_native_alias;
use crate::ledger::types::AccountState;

/// Returned when the account holds no line for the requested asset.
pub const ZERO_BALANCE: &str = "0";

/// Pick the balance for `asset_code` (and `issuer`, when given) from
/// `account`, verbatim as the read API reported it.
pub fn select_balance(account: &AccountState, asset_code: &str, issuer: Option<&str>) -> String {
    let code = asset_code.trim();
    let issuer = issuer.map(str::trim).filter(|i| !i.is_empty());

    account
        .balances
        .iter()
        .find(|line| {
            if is_native_alias(code) {
                return line.is_native();
            }
            line.code.as_deref() == Some(code)
                && issuer.map_or(true, |issuer| line.issuer.as_deref() == Some(issuer))
        })
        .map(|line| line.balance.clone())
        .unwrap_or_else(|| ZERO_BALANCE.to_string())
}
