//! # Transaction Submission
//!
//! The consumed interface for getting a signed construction transaction
//! onto a chain and learning where the vault landed. The only
//! implementation shipped here is the in-process [`Devnet`](crate::devnet::Devnet).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use metavault_contracts::{Account, AssetHandle, VaultError};

use crate::signer::{KeyError, SignedConstructionTx};

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Signature, key, or sender check failed.
    #[error("rejected signature: {0}")]
    Signature(#[from] KeyError),

    /// The transaction's nonce is not the sender's next one.
    #[error("nonce mismatch for {account}: expected {expected}, got {got}")]
    NonceMismatch {
        account: Account,
        expected: u64,
        got: u64,
    },

    /// The artifact's code hash does not match its contents.
    #[error("artifact code hash does not match its contents")]
    CorruptArtifact,

    /// No asset contract with this handle exists on the target.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetHandle),

    /// The derived contract address is already occupied.
    #[error("address {0} already holds a contract")]
    AddressInUse(Account),

    /// The vault constructor aborted.
    #[error("constructor failed: {0}")]
    Constructor(#[from] VaultError),
}

/// Proof that a construction transaction was included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub contract_address: Account,
    pub block: u64,
    pub timestamp: DateTime<Utc>,
}

/// Signs-off point between the deployer and whatever executes transactions.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// The next nonce the target expects from `account`.
    async fn next_nonce(&self, account: &Account) -> Result<u64, SubmitError>;

    /// Broadcasts `signed` and waits for its receipt.
    async fn submit(&self, signed: SignedConstructionTx) -> Result<Receipt, SubmitError>;
}
