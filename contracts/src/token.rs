//! # Local Token
//!
//! An in-memory fungible token with the ERC-20 surface a vault relies on:
//! balances, allowances, `transfer` and `transfer_from`. It implements
//! [`AssetTransferPort`] directly, so a vault can run end-to-end without a
//! chain behind it.
//!
//! ## Semantics
//!
//! - A failing operation changes nothing. Every check happens before the
//!   first write, under a single lock.
//! - An allowance of `Amount::MAX` is unlimited and is never decremented.
//! - `freeze` makes every transfer fail with [`TransferError::Frozen`],
//!   which is how tests reproduce a push that fails after the vault has
//!   already debited.
//!
//! The lock is released before any method returns, and the token never
//! calls back into the vault. Hostile behaviour is layered on top by
//! wrapping it (see the crate's integration tests).

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::port::{AssetTransferPort, TransferError, VaultEntry};
use crate::types::{Account, Amount, AssetHandle};

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<Account, Amount>,
    /// `(owner, spender) -> remaining allowance`
    allowances: HashMap<(Account, Account), Amount>,
    total_supply: Amount,
    frozen: bool,
}

/// Summary of a token's state, for reports and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub asset: AssetHandle,
    pub total_supply: Amount,
    pub holders: usize,
    pub frozen: bool,
}

/// In-memory asset contract.
#[derive(Debug)]
pub struct LocalToken {
    handle: AssetHandle,
    state: Mutex<TokenState>,
}

impl LocalToken {
    /// Creates an empty token with zero supply.
    pub fn new(handle: AssetHandle) -> Self {
        Self {
            handle,
            state: Mutex::new(TokenState::default()),
        }
    }

    pub fn handle(&self) -> &AssetHandle {
        &self.handle
    }

    /// Creates `amount` new units held by `to`.
    pub fn mint(&self, to: &Account, amount: Amount) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;
        let balance = state
            .balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;
        state.total_supply = supply;
        state.balances.insert(to.clone(), balance);
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s holdings to `amount`.
    pub fn approve(
        &self,
        owner: &Account,
        spender: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.frozen {
            return Err(TransferError::Frozen(self.handle.clone()));
        }
        state
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    pub fn allowance(&self, owner: &Account, spender: &Account) -> Amount {
        self.state
            .lock()
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn balance_of(&self, holder: &Account) -> Amount {
        self.state.lock().balances.get(holder).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.lock().total_supply
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(
        &self,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        self.move_funds(&mut state, from, to, amount)
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    pub fn transfer_from(
        &self,
        spender: &Account,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        let key = (from.clone(), spender.clone());
        let allowed = state.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(TransferError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                allowed,
                requested: amount,
            });
        }

        self.move_funds(&mut state, from, to, amount)?;

        if allowed != Amount::MAX {
            state.allowances.insert(key, allowed - amount);
        }
        Ok(())
    }

    /// Halts every transfer until [`thaw`](Self::thaw).
    pub fn freeze(&self) {
        self.state.lock().frozen = true;
    }

    pub fn thaw(&self) {
        self.state.lock().frozen = false;
    }

    pub fn summary(&self) -> TokenSummary {
        let state = self.state.lock();
        TokenSummary {
            asset: self.handle.clone(),
            total_supply: state.total_supply,
            holders: state.balances.values().filter(|b| **b > 0).count(),
            frozen: state.frozen,
        }
    }

    fn move_funds(
        &self,
        state: &mut TokenState,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if state.frozen {
            return Err(TransferError::Frozen(self.handle.clone()));
        }

        let available = state.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                holder: from.clone(),
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let received = state
            .balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        state.balances.insert(from.clone(), available - amount);
        state.balances.insert(to.clone(), received);

        trace!(asset = %self.handle, %from, %to, amount = %amount, "transfer");
        Ok(())
    }
}

impl AssetTransferPort for LocalToken {
    fn asset(&self) -> &AssetHandle {
        &self.handle
    }

    fn pull(
        &self,
        vault: &mut dyn VaultEntry,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.transfer_from(vault.address(), from, to, amount)
    }

    fn push(
        &self,
        vault: &mut dyn VaultEntry,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.transfer(vault.address(), to, amount)
    }

    fn balance_of(&self, holder: &Account) -> Amount {
        LocalToken::balance_of(self, holder)
    }
}
