// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MetaVault Contracts
//!
//! A custodial ledger for one fungible asset, and the capability it uses
//! to move that asset. The vault keeps per-account balances and an
//! aggregate `total_deposits`; the asset itself sits in an external
//! contract the vault does not trust.
//!
//! - **metavault**: the ledger: `deposit`, `withdraw`, `skim`, observers.
//! - **port**: the [`AssetTransferPort`] capability and the re-entry
//!   surface a port sees while a transfer is outstanding.
//! - **token**: an in-memory asset contract implementing the port.
//! - **journal**: the undo log that makes every transition all-or-nothing.
//! - **events**: what each committed transition leaves behind.
//! - **config**: vault settings and contract constants.
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked. Wrapping arithmetic and money do
//!    not mix.
//! 2. The external call happens only when the ledger does not overstate
//!    what has been secured: pull before credit, debit before push.
//! 3. A failed transition leaves no trace, including nested re-entrant
//!    transitions that committed inside it.
//! 4. Every public state type is serializable (serde) for reports and
//!    persistent storage.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use metavault_contracts::{Account, AssetHandle, LocalToken, MetaVault};
//!
//! let token = Arc::new(LocalToken::new(AssetHandle::new("0xt")));
//! let (owner, vault_addr, bob) = (Account::new("0xa"), Account::new("0xv"), Account::new("0xb"));
//! let mut vault = MetaVault::new(owner, vault_addr.clone(), AssetHandle::new("0xt"), token.clone()).unwrap();
//!
//! token.mint(&bob, 100).unwrap();
//! token.approve(&bob, &vault_addr, 100).unwrap();
//! vault.deposit(&bob, 100).unwrap();
//! vault.withdraw(&bob, 40).unwrap();
//!
//! assert_eq!(vault.balance_of(&bob), 60);
//! assert_eq!(vault.total_deposits(), 60);
//! ```

pub mod config;
pub mod events;
pub mod journal;
pub mod metavault;
pub mod port;
pub mod token;
pub mod types;

pub use config::VaultConfig;
pub use events::VaultEvent;
pub use metavault::{MetaVault, VaultError, VaultSnapshot};
pub use port::{AssetTransferPort, TransferError, VaultEntry};
pub use token::{LocalToken, TokenSummary};
pub use types::{Account, Amount, AssetHandle, Operation};
