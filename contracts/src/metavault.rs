//! # MetaVault Ledger
//!
//! A custodial ledger for a single fungible asset. Users deposit the asset
//! (the vault pulls it from them), withdraw it (the vault pushes it back),
//! and the owner can skim from the vault's holdings. The vault records who
//! is owed what; the asset itself lives in an external contract reached
//! through an [`AssetTransferPort`].
//!
//! ## Ordering
//!
//! The external call is the dangerous part of every transition, because
//! the asset contract is untrusted and may call back in before returning.
//! The ledger is only ever handed to it in a state that does not overstate
//! what has been secured:
//!
//! - `deposit` pulls first and credits after. Nothing is written before
//!   the call, so there is nothing for a re-entrant call to exploit.
//! - `withdraw` debits first and pushes after. A re-entrant `withdraw`
//!   sees the already-reduced balance and cannot spend the same funds
//!   twice.
//! - `skim` pushes to the owner and writes nothing.
//!
//! On top of the ordering, an in-progress flag rejects re-entry outright
//! (see [`VaultConfig::reentrancy_guard`]).
//!
//! ## Atomicity
//!
//! Every write goes through the [`Journal`]. A transition that fails for
//! any reason, including a failed push after the debit, unwinds to its
//! entry checkpoint, so `balances` and `total_deposits` end up exactly as
//! they were before the call.
//!
//! ## Known hazard: skim
//!
//! `skim` moves asset out of the vault without touching any balance or
//! `total_deposits`. After a skim the external holdings can fall below
//! `total_deposits`, and later withdrawals fail at the push even though
//! the ledger says the funds are there. This is the contract as deployed
//! and is kept as-is; [`MetaVault::shortfall`] makes it observable.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::VaultConfig;
use crate::events::VaultEvent;
use crate::journal::{Checkpoint, Journal, JournalEntry};
use crate::port::{AssetTransferPort, TransferError, VaultEntry};
use crate::types::{Account, Amount, AssetHandle, Operation};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a transition aborted. An abort never leaves partial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// `withdraw` asked for more than the caller's recorded balance.
    #[error("insufficient balance: {account} has {available}, requested {requested}")]
    InsufficientBalance {
        /// The withdrawing account.
        account: Account,
        /// Its recorded balance.
        available: Amount,
        /// The amount it asked for.
        requested: Amount,
    },

    /// The external pull or push reported failure.
    #[error("{operation}: asset transfer failed: {source}")]
    TransferFailed {
        /// The entry point whose transfer failed.
        operation: Operation,
        /// What the asset contract reported.
        source: TransferError,
    },

    /// `skim` called by someone other than the owner.
    #[error("caller {caller} is not the owner")]
    NotOwner {
        /// The rejected caller.
        caller: Account,
    },

    /// An entry point was invoked while another transition on this vault
    /// was still in progress.
    #[error("reentrant {operation} rejected: a transition is already in progress")]
    Reentrancy {
        /// The entry point that attempted to re-enter.
        operation: Operation,
    },

    /// Crediting would overflow an account balance or the total.
    #[error("balance overflow: {account} at {current}, credit {credit}")]
    Overflow {
        /// The account being credited.
        account: Account,
        /// The value that would have overflowed.
        current: Amount,
        /// The amount that caused it.
        credit: Amount,
    },

    /// The injected port moves a different asset than the vault is bound to.
    #[error("asset mismatch: vault bound to {expected}, port moves {actual}")]
    AssetMismatch {
        expected: AssetHandle,
        actual: AssetHandle,
    },

    /// `total_deposits` disagrees with the sum of balances.
    #[error("ledger invariant violated: total_deposits {recorded}, sum of balances {actual}")]
    InvariantViolated {
        recorded: Amount,
        actual: Amount,
    },
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time copy of the ledger, ordered by account for stable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub address: Account,
    pub asset: AssetHandle,
    pub owner: Account,
    pub balances: BTreeMap<Account, Amount>,
    pub total_deposits: Amount,
}

// ---------------------------------------------------------------------------
// MetaVault
// ---------------------------------------------------------------------------

/// The ledger. Owns every piece of contract state; nothing is ambient.
pub struct MetaVault {
    /// The vault's own account, the `to` of pulls and the source of pushes.
    address: Account,
    /// Bound asset. Immutable.
    asset: AssetHandle,
    /// The constructing caller. Immutable.
    owner: Account,
    /// Recorded balances. Keys are added, never removed, except when a
    /// failed transition unwinds the write that introduced them.
    balances: BTreeMap<Account, Amount>,
    total_deposits: Amount,
    config: VaultConfig,
    port: Arc<dyn AssetTransferPort>,
    /// Set while any transition is running.
    entered: bool,
    /// Nesting depth of running transitions (more than one only when the
    /// guard is off and a port re-enters).
    depth: u32,
    journal: Journal,
    events: VecDeque<VaultEvent>,
    next_seq: u64,
}

impl fmt::Debug for MetaVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaVault")
            .field("address", &self.address)
            .field("asset", &self.asset)
            .field("owner", &self.owner)
            .field("accounts", &self.balances.len())
            .field("total_deposits", &self.total_deposits)
            .field("entered", &self.entered)
            .finish_non_exhaustive()
    }
}

impl MetaVault {
    /// Constructs a vault with the default [`VaultConfig`].
    ///
    /// `deployer` becomes the owner. `address` is the account the host
    /// environment assigned to this vault.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AssetMismatch`] if `port` does not move `asset`.
    pub fn new(
        deployer: Account,
        address: Account,
        asset: AssetHandle,
        port: Arc<dyn AssetTransferPort>,
    ) -> Result<Self, VaultError> {
        Self::with_config(deployer, address, asset, port, VaultConfig::default())
    }

    /// Constructs a vault with an explicit configuration.
    pub fn with_config(
        deployer: Account,
        address: Account,
        asset: AssetHandle,
        port: Arc<dyn AssetTransferPort>,
        config: VaultConfig,
    ) -> Result<Self, VaultError> {
        if port.asset() != &asset {
            return Err(VaultError::AssetMismatch {
                expected: asset,
                actual: port.asset().clone(),
            });
        }

        debug!(
            vault = %address,
            owner = %deployer,
            asset = %asset,
            guard = config.reentrancy_guard,
            "vault constructed"
        );

        Ok(Self {
            address,
            asset,
            owner: deployer,
            balances: BTreeMap::new(),
            total_deposits: 0,
            config,
            port,
            entered: false,
            depth: 0,
            journal: Journal::new(),
            events: VecDeque::new(),
            next_seq: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Pulls `amount` from `caller` into the vault, then credits it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::TransferFailed`] if the pull fails.
    /// - [`VaultError::Overflow`] if the credit would overflow.
    /// - [`VaultError::Reentrancy`] if called during another transition
    ///   with the guard on.
    pub fn deposit(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        self.transition(Operation::Deposit, caller, amount, |vault| {
            // Reject up front what would overflow once credited, so the
            // asset is not pulled for a credit that cannot land.
            vault.credited_values(caller, amount)?;

            let port = Arc::clone(&vault.port);
            let this = vault.address.clone();
            port.pull(&mut *vault, caller, &this, amount)
                .map_err(|source| VaultError::TransferFailed {
                    operation: Operation::Deposit,
                    source,
                })?;

            // Re-entrant deposits during the pull may have moved either
            // value, so compute again from the current state.
            let (balance, total) = vault.credited_values(caller, amount)?;
            vault.write_balance(caller, balance);
            vault.write_total(total);
            vault.emit(|seq| VaultEvent::Deposited {
                seq,
                account: caller.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Debits `amount` from `caller`, then pushes it to them.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InsufficientBalance`] if the recorded balance is short.
    /// - [`VaultError::TransferFailed`] if the push fails; the debit is
    ///   rolled back.
    /// - [`VaultError::Reentrancy`] if called during another transition
    ///   with the guard on.
    pub fn withdraw(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        self.transition(Operation::Withdraw, caller, amount, |vault| {
            let available = vault.balance_of(caller);
            if available < amount {
                return Err(VaultError::InsufficientBalance {
                    account: caller.clone(),
                    available,
                    requested: amount,
                });
            }

            // Effects before the interaction.
            let remaining_total = match vault.total_deposits.checked_sub(amount) {
                Some(total) => total,
                None => return Err(vault.invariant_error()),
            };
            vault.write_balance(caller, available - amount);
            vault.write_total(remaining_total);

            let port = Arc::clone(&vault.port);
            port.push(&mut *vault, caller, amount)
                .map_err(|source| VaultError::TransferFailed {
                    operation: Operation::Withdraw,
                    source,
                })?;

            vault.emit(|seq| VaultEvent::Withdrawn {
                seq,
                account: caller.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Owner-only: pushes `amount` from the vault's holdings to the owner
    /// without adjusting any recorded balance.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotOwner`] if `caller` is not the owner. No transfer
    ///   is attempted.
    /// - [`VaultError::TransferFailed`] if the push fails.
    /// - [`VaultError::Reentrancy`] if called during another transition
    ///   with the guard on.
    pub fn skim(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        self.transition(Operation::Skim, caller, amount, |vault| {
            if caller != &vault.owner {
                return Err(VaultError::NotOwner {
                    caller: caller.clone(),
                });
            }

            let port = Arc::clone(&vault.port);
            let owner = vault.owner.clone();
            port.push(&mut *vault, &owner, amount)
                .map_err(|source| VaultError::TransferFailed {
                    operation: Operation::Skim,
                    source,
                })?;

            vault.emit(|seq| VaultEvent::Skimmed {
                seq,
                owner: owner.clone(),
                amount,
            });
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Recorded balance of `account`. Zero for accounts never seen.
    pub fn balance_of(&self, account: &Account) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_deposits(&self) -> Amount {
        self.total_deposits
    }

    pub fn asset(&self) -> &AssetHandle {
        &self.asset
    }

    pub fn owner(&self) -> &Account {
        &self.owner
    }

    pub fn address(&self) -> &Account {
        &self.address
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Whether a transition is currently running.
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// Number of accounts with a balance entry (including zeroed ones).
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// The vault's external holdings, as reported by the asset.
    pub fn backing(&self) -> Amount {
        self.port.balance_of(&self.address)
    }

    /// How far recorded deposits exceed the external holdings. Non-zero
    /// after the owner skims funds that back user balances.
    pub fn shortfall(&self) -> Amount {
        self.total_deposits.saturating_sub(self.backing())
    }

    /// Logged events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &VaultEvent> {
        self.events.iter()
    }

    /// Removes and returns every logged event.
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        self.events.drain(..).collect()
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            address: self.address.clone(),
            asset: self.asset.clone(),
            owner: self.owner.clone(),
            balances: self.balances.clone(),
            total_deposits: self.total_deposits,
        }
    }

    /// Recomputes `Σ balances` and compares it with `total_deposits`.
    pub fn audit(&self) -> Result<(), VaultError> {
        let actual = self.sum_of_balances();
        if actual != self.total_deposits {
            return Err(VaultError::InvariantViolated {
                recorded: self.total_deposits,
                actual,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transition machinery
    // -----------------------------------------------------------------------

    /// Runs `body` as one all-or-nothing transition.
    fn transition<F>(
        &mut self,
        operation: Operation,
        caller: &Account,
        amount: Amount,
        body: F,
    ) -> Result<(), VaultError>
    where
        F: FnOnce(&mut Self) -> Result<(), VaultError>,
    {
        if self.entered && self.config.reentrancy_guard {
            warn!(
                vault = %self.address,
                %operation,
                caller = %caller,
                amount = %amount,
                "reentrant call rejected"
            );
            return Err(VaultError::Reentrancy { operation });
        }

        let checkpoint = self.journal.checkpoint();
        let was_entered = std::mem::replace(&mut self.entered, true);
        self.depth += 1;

        let mut result = body(self);

        self.depth -= 1;
        self.entered = was_entered;

        if result.is_ok() && self.depth == 0 && self.config.audit_invariant {
            result = self.audit();
        }

        match result {
            Ok(()) => {
                if self.depth == 0 {
                    self.journal.clear();
                }
                debug!(
                    vault = %self.address,
                    %operation,
                    caller = %caller,
                    amount = %amount,
                    depth = self.depth,
                    total_deposits = %self.total_deposits,
                    "transition committed"
                );
                Ok(())
            }
            Err(err) => {
                self.revert(checkpoint);
                warn!(
                    vault = %self.address,
                    %operation,
                    caller = %caller,
                    amount = %amount,
                    depth = self.depth,
                    error = %err,
                    "transition reverted"
                );
                Err(err)
            }
        }
    }

    /// Unwinds every write made since `checkpoint`.
    fn revert(&mut self, checkpoint: Checkpoint) {
        for entry in self.journal.unwind(checkpoint) {
            match entry {
                JournalEntry::Balance {
                    account,
                    previous: Some(amount),
                } => {
                    self.balances.insert(account, amount);
                }
                JournalEntry::Balance {
                    account,
                    previous: None,
                } => {
                    self.balances.remove(&account);
                }
                JournalEntry::TotalDeposits { previous } => {
                    self.total_deposits = previous;
                }
                JournalEntry::EventEmitted { previous_seq } => {
                    self.events.pop_back();
                    self.next_seq = previous_seq;
                }
                JournalEntry::EventEvicted(event) => {
                    self.events.push_front(event);
                }
            }
        }
    }

    /// The balance and total that crediting `amount` to `account` would
    /// produce, or the overflow that prevents it.
    fn credited_values(
        &self,
        account: &Account,
        amount: Amount,
    ) -> Result<(Amount, Amount), VaultError> {
        let current = self.balance_of(account);
        let balance = current.checked_add(amount).ok_or(VaultError::Overflow {
            account: account.clone(),
            current,
            credit: amount,
        })?;
        let total = self
            .total_deposits
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                account: account.clone(),
                current: self.total_deposits,
                credit: amount,
            })?;
        Ok((balance, total))
    }

    fn write_balance(&mut self, account: &Account, amount: Amount) {
        let previous = self.balances.insert(account.clone(), amount);
        self.journal.record(JournalEntry::Balance {
            account: account.clone(),
            previous,
        });
    }

    fn write_total(&mut self, amount: Amount) {
        let previous = std::mem::replace(&mut self.total_deposits, amount);
        self.journal.record(JournalEntry::TotalDeposits { previous });
    }

    fn emit(&mut self, make: impl FnOnce(u64) -> VaultEvent) {
        if self.config.max_events == 0 {
            return;
        }
        if self.events.len() >= self.config.max_events {
            if let Some(oldest) = self.events.pop_front() {
                self.journal.record(JournalEntry::EventEvicted(oldest));
            }
        }
        let seq = self.next_seq;
        self.events.push_back(make(seq));
        self.next_seq += 1;
        self.journal
            .record(JournalEntry::EventEmitted { previous_seq: seq });
    }

    fn sum_of_balances(&self) -> Amount {
        self.balances
            .values()
            .fold(0, |acc: Amount, b| acc.saturating_add(*b))
    }

    fn invariant_error(&self) -> VaultError {
        VaultError::InvariantViolated {
            recorded: self.total_deposits,
            actual: self.sum_of_balances(),
        }
    }
}

impl VaultEntry for MetaVault {
    fn address(&self) -> &Account {
        &self.address
    }

    fn deposit(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        MetaVault::deposit(self, caller, amount)
    }

    fn withdraw(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        MetaVault::withdraw(self, caller, amount)
    }

    fn skim(&mut self, caller: &Account, amount: Amount) -> Result<(), VaultError> {
        MetaVault::skim(self, caller, amount)
    }

    fn balance_of(&self, account: &Account) -> Amount {
        MetaVault::balance_of(self, account)
    }

    fn total_deposits(&self) -> Amount {
        self.total_deposits
    }
}
