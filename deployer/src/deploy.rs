//! # Deployment Pipeline
//!
//! compile → build construction transaction → sign → submit → receipt.
//! Each step goes through its trait, so the same pipeline runs against
//! the devnet in tests and any other submitter later.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use metavault_contracts::{Account, AssetHandle, VaultConfig};

use crate::compiler::{Artifact, ContractCompiler, ContractSource};
use crate::signer::{ConstructionTx, DeployerKey};
use crate::submit::{Receipt, Submitter};

/// Gas parameters for the construction transaction.
#[derive(Debug, Clone, Copy)]
pub struct GasSettings {
    pub limit: u64,
    pub price_gwei: u64,
}

/// Everything a deployment produced.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub owner: Account,
    pub asset: AssetHandle,
    pub code_hash: String,
    pub receipt: Receipt,
}

/// Compiles, signs and submits a vault bound to `asset`.
pub async fn deploy_vault(
    compiler: &dyn ContractCompiler,
    submitter: &dyn Submitter,
    key: &DeployerKey,
    asset: &AssetHandle,
    config: VaultConfig,
    gas: GasSettings,
) -> Result<Deployment> {
    let artifact: Artifact = compiler
        .compile(&ContractSource::metavault(config))
        .context("failed to compile contract")?;
    if artifact.entry_point("constructor").is_none() {
        bail!("artifact {} exposes no constructor", artifact.contract);
    }
    tracing::info!(code_hash = %artifact.code_hash, "compiling contract... done");

    let from = key.account();
    let nonce = submitter
        .next_nonce(&from)
        .await
        .with_context(|| format!("failed to fetch nonce for {from}"))?;

    let code_hash = artifact.code_hash.clone();
    let signed = key.sign(ConstructionTx {
        from: from.clone(),
        nonce,
        asset: asset.clone(),
        artifact,
        gas_limit: gas.limit,
        gas_price_gwei: gas.price_gwei,
    });
    tracing::info!(tx_hash = %signed.tx_hash(), nonce, "deploying contract...");

    let receipt = submitter
        .submit(signed)
        .await
        .context("construction transaction failed")?;

    Ok(Deployment {
        owner: from,
        asset: asset.clone(),
        code_hash,
        receipt,
    })
}
