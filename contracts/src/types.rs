//! # Ledger Primitives
//!
//! Identities and amounts shared by every module in the crate. An
//! [`Account`] is opaque to the ledger beyond being a unique key; an
//! [`AssetHandle`] names the external asset contract a vault is bound to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Units of the underlying asset, in its smallest denomination.
///
/// `u128` rather than `u64`: external asset contracts commonly count in
/// 18-decimal units, and `u64` tops out at ~18.4 tokens of that kind.
pub type Amount = u128;

/// Identity of a participant: a user, the vault itself, or the owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Wraps an identity string exactly as given. Two accounts are the
    /// same key only if their strings are byte-for-byte equal.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Identity of the external asset contract. Fixed at vault construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(String);

impl AssetHandle {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetHandle {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// The three state-changing entry points. Carried in errors, events and
/// log fields so a failure can always be traced to the call that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deposit,
    Withdraw,
    Skim,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Deposit => write!(f, "deposit"),
            Operation::Withdraw => write!(f, "withdraw"),
            Operation::Skim => write!(f, "skim"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_are_compared_verbatim() {
        assert_ne!(Account::new("AbC"), Account::new("abc"));
        assert_ne!(Account::new("0xab"), Account::new(" 0xab"));
        let from_str: Account = "AbC".into();
        assert_eq!(from_str, Account::new("AbC"));
    }

    #[test]
    fn asset_handles_are_compared_verbatim() {
        assert_ne!(AssetHandle::new("0xT"), AssetHandle::new("0xt"));
        let from_str: AssetHandle = "0xT".into();
        assert_eq!(from_str.as_str(), "0xT");
    }

    #[test]
    fn account_serializes_as_plain_string() {
        let json = serde_json::to_string(&Account::new("0xBEEF")).unwrap();
        assert_eq!(json, "\"0xBEEF\"");
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::Withdraw.to_string(), "withdraw");
    }
}
