//! # Asset Transfer Port
//!
//! The capability a vault uses to move the underlying asset in and out of
//! its external holdings. The implementation belongs to a third party and
//! is not trusted: it may fail, it may burn unbounded computation, and it
//! may call straight back into the vault before returning.
//!
//! That last case is why every port method receives the vault as a
//! `&mut dyn VaultEntry`. A re-entrant call is not an exotic edge case to
//! be hidden behind interior mutability; it is part of the contract, and
//! the type signature says so. The vault hands itself to the port only
//! after its own state is consistent for an observer (see the ordering
//! rules in [`crate::metavault`]).

use thiserror::Error;

use crate::metavault::VaultError;
use crate::types::{Account, Amount, AssetHandle};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an external transfer did not happen.
///
/// A port that returns an error must leave its own state untouched; the
/// vault relies on that to treat the whole transition as never having
/// occurred.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source does not hold enough of the asset.
    #[error("insufficient funds: {holder} holds {available}, transfer needs {requested}")]
    InsufficientFunds {
        /// Account the asset would have been taken from.
        holder: Account,
        /// Its current external balance.
        available: Amount,
        /// The amount the transfer needed.
        requested: Amount,
    },

    /// The source has not authorized the spender for this much.
    #[error("insufficient allowance: {owner} allows {spender} {allowed}, transfer needs {requested}")]
    InsufficientAllowance {
        /// Account whose holdings would move.
        owner: Account,
        /// Account attempting the move (the vault, for a pull).
        spender: Account,
        /// Remaining approved amount.
        allowed: Amount,
        /// The amount the transfer needed.
        requested: Amount,
    },

    /// The asset contract has halted all transfers.
    #[error("asset {0} is frozen")]
    Frozen(AssetHandle),

    /// Arithmetic overflow on the receiving side.
    #[error("recipient balance overflow for {0}")]
    Overflow(Account),

    /// Any other refusal, with the callee's own reason.
    #[error("transfer rejected: {reason}")]
    Rejected {
        /// Free-form reason reported by the asset implementation.
        reason: String,
    },
}

impl From<VaultError> for TransferError {
    /// Lets a re-entrant port bubble a nested vault failure up as its own.
    fn from(err: VaultError) -> Self {
        TransferError::Rejected {
            reason: format!("nested vault call failed: {err}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The vault surface reachable from inside an outstanding transfer.
///
/// Implemented by [`crate::metavault::MetaVault`]. Ports receive it so a
/// hostile asset can attempt exactly what a hostile contract could: call
/// any entry point again, as any caller, before the original call returns.
pub trait VaultEntry {
    /// The vault's own account (the `self` of pull and push).
    fn address(&self) -> &Account;

    /// Re-enter [`deposit`](crate::metavault::MetaVault::deposit).
    fn deposit(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError>;

    /// Re-enter [`withdraw`](crate::metavault::MetaVault::withdraw).
    fn withdraw(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError>;

    /// Re-enter [`skim`](crate::metavault::MetaVault::skim).
    fn skim(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError>;

    /// Recorded balance of `account`, as the vault sees it right now.
    fn balance_of(&self, account: &Account) -> Amount;

    /// Recorded aggregate of all balances, as the vault sees it right now.
    fn total_deposits(&self) -> Amount;
}

/// External asset capability injected into a vault at construction.
///
/// Both transfer methods are synchronous from the vault's point of view
/// and may re-enter it through `vault`.
pub trait AssetTransferPort: Send + Sync {
    /// The asset contract this port moves.
    fn asset(&self) -> &AssetHandle;

    /// Move `amount` from `from`'s external holdings to `to`, spending an
    /// allowance granted to the vault.
    fn pull(
        &self,
        vault: &mut dyn VaultEntry,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Move `amount` out of the vault's own external holdings to `to`.
    fn push(
        &self,
        vault: &mut dyn VaultEntry,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// External holdings of `holder`. Read-only.
    fn balance_of(&self, holder: &Account) -> Amount;
}
