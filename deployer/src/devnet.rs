//! # In-Process Devnet
//!
//! A stand-in for a real chain: it holds asset contracts and deployed
//! vaults in memory, executes construction transactions, and lets callers
//! invoke vault entry points directly. One transaction per block; blocks
//! exist only to number receipts.
//!
//! Contract addresses are derived from `(sender, nonce)` the same way on
//! every run, so a given key deploys to a predictable address.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use metavault_contracts::{Account, AssetHandle, LocalToken, MetaVault};

use crate::signer::SignedConstructionTx;
use crate::submit::{Receipt, SubmitError, Submitter};

#[derive(Debug, Default)]
struct DevnetState {
    block: u64,
    nonces: HashMap<Account, u64>,
    tokens: HashMap<AssetHandle, Arc<LocalToken>>,
    vaults: HashMap<Account, MetaVault>,
}

/// In-memory execution environment for vaults and their asset.
#[derive(Debug, Default)]
pub struct Devnet {
    state: Mutex<DevnetState>,
}

/// Address a contract created by `sender` at `nonce` lands on: `0x` + the
/// last 20 bytes of `SHA-256(sender || nonce)`.
pub fn contract_address(sender: &Account, nonce: u64) -> Account {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_str().as_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    Account::new(format!("0x{}", hex::encode(&digest[12..])))
}

impl Devnet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset contract, or returns the existing one.
    pub fn register_token(&self, handle: &AssetHandle) -> Arc<LocalToken> {
        let mut state = self.state.lock();
        Arc::clone(
            state
                .tokens
                .entry(handle.clone())
                .or_insert_with(|| Arc::new(LocalToken::new(handle.clone()))),
        )
    }

    /// Runs `f` against the vault at `address`, if there is one.
    pub fn with_vault<R>(&self, address: &Account, f: impl FnOnce(&mut MetaVault) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.vaults.get_mut(address).map(f)
    }

    pub fn block_height(&self) -> u64 {
        self.state.lock().block
    }

    pub fn vault_count(&self) -> usize {
        self.state.lock().vaults.len()
    }
}

#[async_trait]
impl Submitter for Devnet {
    async fn next_nonce(&self, account: &Account) -> Result<u64, SubmitError> {
        Ok(self.state.lock().nonces.get(account).copied().unwrap_or(0))
    }

    async fn submit(&self, signed: SignedConstructionTx) -> Result<Receipt, SubmitError> {
        signed.verify()?;
        if !signed.tx.artifact.is_intact() {
            return Err(SubmitError::CorruptArtifact);
        }

        let tx = &signed.tx;
        let mut state = self.state.lock();

        let expected = state.nonces.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(SubmitError::NonceMismatch {
                account: tx.from.clone(),
                expected,
                got: tx.nonce,
            });
        }

        let token = state
            .tokens
            .get(&tx.asset)
            .cloned()
            .ok_or_else(|| SubmitError::UnknownAsset(tx.asset.clone()))?;

        let address = contract_address(&tx.from, tx.nonce);
        if state.vaults.contains_key(&address) {
            return Err(SubmitError::AddressInUse(address));
        }

        let vault = MetaVault::with_config(
            tx.from.clone(),
            address.clone(),
            tx.asset.clone(),
            token,
            tx.artifact.config.clone(),
        )?;

        state.vaults.insert(address.clone(), vault);
        state.nonces.insert(tx.from.clone(), expected + 1);
        state.block += 1;

        let receipt = Receipt {
            tx_hash: signed.tx_hash(),
            contract_address: address,
            block: state.block,
            timestamp: Utc::now(),
        };

        tracing::info!(
            tx_hash = %receipt.tx_hash,
            contract = %receipt.contract_address,
            block = receipt.block,
            owner = %tx.from,
            "vault deployed"
        );
        Ok(receipt)
    }
}
