//! # Ledger Scenario
//!
//! Deploys a vault on a devnet and walks it through the reference
//! sequence: a user deposits, withdraws part, over-withdraws, and the
//! owner skims. Every step records the outcome and the ledger state after
//! it, so the report shows the skim leaving recorded balances in place
//! while the backing drains.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use metavault_contracts::{
    Account, Amount, AssetHandle, MetaVault, Operation, TokenSummary, VaultConfig, VaultEvent,
    VaultSnapshot,
};

use crate::compiler::NativeCompiler;
use crate::deploy::{deploy_vault, Deployment, GasSettings};
use crate::devnet::Devnet;
use crate::signer::DeployerKey;

/// Funds minted to the depositing user before the run.
const USER_FUNDS: Amount = 100;

/// One scripted call and what it left behind.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub caller: Account,
    pub operation: Operation,
    pub amount: Amount,
    /// `None` on success, the abort reason otherwise.
    pub error: Option<String>,
    pub user_balance: Amount,
    pub total_deposits: Amount,
    pub backing: Amount,
    pub shortfall: Amount,
}

/// Full record of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub deployment: Deployment,
    pub user: Account,
    pub steps: Vec<StepReport>,
    pub final_state: VaultSnapshot,
    pub events: Vec<VaultEvent>,
    pub token: TokenSummary,
}

impl ScenarioReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.error.is_some())
    }
}

/// Runs the reference scenario on a fresh devnet.
pub async fn run(config: VaultConfig, gas: GasSettings) -> Result<ScenarioReport> {
    let devnet = Devnet::new();
    let asset = AssetHandle::new(crate::config::DEFAULT_TOKEN_ADDRESS);
    let token = devnet.register_token(&asset);
    let owner_key = DeployerKey::generate();

    let deployment = deploy_vault(&NativeCompiler, &devnet, &owner_key, &asset, config, gas).await?;
    let vault_addr = deployment.receipt.contract_address.clone();
    let owner = deployment.owner.clone();

    let user = DeployerKey::generate().account();
    token
        .mint(&user, USER_FUNDS)
        .context("failed to fund scenario user")?;
    token
        .approve(&user, &vault_addr, USER_FUNDS)
        .context("failed to approve vault")?;

    let script: [(&Account, Operation, Amount); 4] = [
        (&user, Operation::Deposit, 100),
        (&user, Operation::Withdraw, 40),
        (&user, Operation::Withdraw, 1_000),
        (&owner, Operation::Skim, 60),
    ];

    let mut steps = Vec::with_capacity(script.len());
    for (step, (caller, operation, amount)) in script.into_iter().enumerate() {
        let report = devnet
            .with_vault(&vault_addr, |vault| {
                let outcome = call(vault, caller, operation, amount);
                StepReport {
                    step: step + 1,
                    caller: caller.clone(),
                    operation,
                    amount,
                    error: outcome.err().map(|e| e.to_string()),
                    user_balance: vault.balance_of(&user),
                    total_deposits: vault.total_deposits(),
                    backing: vault.backing(),
                    shortfall: vault.shortfall(),
                }
            })
            .ok_or_else(|| anyhow!("vault {vault_addr} vanished from devnet"))?;

        tracing::info!(
            step = report.step,
            operation = %report.operation,
            amount = %report.amount,
            ok = report.error.is_none(),
            total_deposits = %report.total_deposits,
            "scenario step"
        );
        steps.push(report);
    }

    let (final_state, events) = devnet
        .with_vault(&vault_addr, |vault| (vault.snapshot(), vault.drain_events()))
        .ok_or_else(|| anyhow!("vault {vault_addr} vanished from devnet"))?;

    Ok(ScenarioReport {
        deployment,
        user,
        steps,
        final_state,
        events,
        token: token.summary(),
    })
}

fn call(
    vault: &mut MetaVault,
    caller: &Account,
    operation: Operation,
    amount: Amount,
) -> Result<(), metavault_contracts::VaultError> {
    match operation {
        Operation::Deposit => vault.deposit(caller, amount),
        Operation::Withdraw => vault.withdraw(caller, amount),
        Operation::Skim => vault.skim(caller, amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAS: GasSettings = GasSettings {
        limit: 500_000,
        price_gwei: 50,
    };

    #[tokio::test]
    async fn reference_scenario_matches_expected_ledger() {
        let report = run(VaultConfig::default(), GAS).await.unwrap();

        let balances: Vec<Amount> = report.steps.iter().map(|s| s.user_balance).collect();
        assert_eq!(balances, vec![100, 60, 60, 60]);

        let totals: Vec<Amount> = report.steps.iter().map(|s| s.total_deposits).collect();
        assert_eq!(totals, vec![100, 60, 60, 60]);

        let failed: Vec<usize> = report.failed_steps().map(|s| s.step).collect();
        assert_eq!(failed, vec![3]);
        assert!(report.steps[2]
            .error
            .as_deref()
            .unwrap()
            .contains("insufficient balance"));

        // The skim drains the backing but not the ledger.
        let last = &report.steps[3];
        assert_eq!(last.backing, 0);
        assert_eq!(last.shortfall, 60);
        assert_eq!(report.final_state.total_deposits, 60);
        assert_eq!(report.events.len(), 3);
        assert_eq!(report.final_state.owner, report.deployment.owner);
    }

    #[tokio::test]
    async fn report_serializes() {
        let report = run(VaultConfig::default(), GAS).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"].as_array().unwrap().len(), 4);
        assert_eq!(json["steps"][3]["operation"], "skim");
        assert!(json["steps"][0]["error"].is_null());
    }
}
