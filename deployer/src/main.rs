// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MetaVault Deployer
//!
//! Entry point for the `metavault` binary. Parses CLI arguments,
//! initializes logging, and runs one of:
//!
//! - `deploy`: compile, sign and submit a vault to the devnet
//! - `interface`: print the compiled interface description
//! - `simulate`: run the reference ledger scenario and print a report
//! - `version`: print build version information

mod cli;
mod compiler;
mod config;
mod deploy;
mod devnet;
mod logging;
mod scenario;
mod signer;
mod submit;

use anyhow::{Context, Result};
use clap::Parser;

use metavault_contracts::config::{CONTRACT_NAME, INTERFACE_VERSION};
use metavault_contracts::AssetHandle;

use cli::{Commands, MetaVaultCli};
use compiler::{ContractCompiler, ContractSource, NativeCompiler};
use deploy::GasSettings;
use devnet::Devnet;
use signer::DeployerKey;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MetaVaultCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match cli.command {
        Commands::Deploy(args) => run_deploy(args).await,
        Commands::Interface(args) => print_interface(args),
        Commands::Simulate(args) => run_simulation(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Deploys a vault to a fresh in-process devnet and prints the result.
async fn run_deploy(args: cli::DeployArgs) -> Result<()> {
    let config = args.vault.load()?;

    let key = match args.private_key.as_deref() {
        Some(hex_key) => DeployerKey::from_hex(hex_key).context("invalid PRIVATE_KEY")?,
        None => {
            tracing::warn!("no deployer key given, generating an ephemeral one");
            DeployerKey::generate()
        }
    };

    let asset = AssetHandle::new(&args.token_address);
    let devnet = Devnet::new();
    devnet.register_token(&asset);

    tracing::info!(
        owner = %key.account(),
        asset = %asset,
        guard = config.reentrancy_guard,
        "deploying vault"
    );

    let deployment = deploy::deploy_vault(
        &NativeCompiler,
        &devnet,
        &key,
        &asset,
        config,
        GasSettings {
            limit: args.gas.gas_limit,
            price_gwei: args.gas.gas_price_gwei,
        },
    )
    .await?;

    tracing::debug!(
        vaults = devnet.vault_count(),
        height = devnet.block_height(),
        "devnet state after deployment"
    );

    println!("Deployment complete.");
    println!("  Contract address : {}", deployment.receipt.contract_address);
    println!("  Owner            : {}", deployment.owner);
    println!("  Asset            : {}", deployment.asset);
    println!("  Code hash        : {}", deployment.code_hash);
    println!("  Tx hash          : {}", deployment.receipt.tx_hash);
    println!("  Block            : {}", deployment.receipt.block);

    Ok(())
}

/// Prints the interface description of the vault as compiled with the
/// given configuration.
fn print_interface(args: cli::VaultConfigArgs) -> Result<()> {
    let config = args.load()?;
    let artifact = NativeCompiler
        .compile(&ContractSource::metavault(config))
        .context("failed to compile contract")?;
    let json =
        serde_json::to_string_pretty(&artifact).context("failed to encode interface description")?;
    println!("{json}");
    Ok(())
}

/// Runs the reference scenario and prints its report as JSON.
async fn run_simulation(args: cli::SimulateArgs) -> Result<()> {
    let config = args.vault.load()?;
    let report = scenario::run(
        config,
        GasSettings {
            limit: args.gas.gas_limit,
            price_gwei: args.gas.gas_price_gwei,
        },
    )
    .await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to encode scenario report")?;
    println!("{json}");

    let failed = report.failed_steps().count();
    tracing::info!(
        steps = report.steps.len(),
        failed,
        shortfall = %report.steps.last().map(|s| s.shortfall).unwrap_or(0),
        "scenario finished"
    );
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("metavault {}", env!("CARGO_PKG_VERSION"));
    println!("contract  {CONTRACT_NAME} (interface {INTERFACE_VERSION})");
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
