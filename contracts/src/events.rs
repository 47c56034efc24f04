//! # Vault Events
//!
//! A committed transition leaves one event behind. Events are written
//! through the journal like any other state, so a transition that reverts
//! takes its events (and those of any nested transitions) with it.

use serde::{Deserialize, Serialize};

use crate::types::{Account, Amount, Operation};

/// Record of a committed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEvent {
    /// `account` deposited `amount`; its balance and the total grew by it.
    Deposited {
        seq: u64,
        account: Account,
        amount: Amount,
    },
    /// `account` withdrew `amount`; its balance and the total shrank by it.
    Withdrawn {
        seq: u64,
        account: Account,
        amount: Amount,
    },
    /// The owner moved `amount` out of the vault's holdings. No recorded
    /// balance changed.
    Skimmed {
        seq: u64,
        owner: Account,
        amount: Amount,
    },
}

impl VaultEvent {
    /// Position of this event in the vault's history. Strictly increasing
    /// across committed events.
    pub fn seq(&self) -> u64 {
        match self {
            VaultEvent::Deposited { seq, .. }
            | VaultEvent::Withdrawn { seq, .. }
            | VaultEvent::Skimmed { seq, .. } => *seq,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            VaultEvent::Deposited { .. } => Operation::Deposit,
            VaultEvent::Withdrawn { .. } => Operation::Withdraw,
            VaultEvent::Skimmed { .. } => Operation::Skim,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            VaultEvent::Deposited { amount, .. }
            | VaultEvent::Withdrawn { amount, .. }
            | VaultEvent::Skimmed { amount, .. } => *amount,
        }
    }
}
