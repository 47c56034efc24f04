//! # CLI Interface
//!
//! Defines the command-line argument structure for `metavault` using
//! `clap` derive. Supports four subcommands: `deploy`, `interface`,
//! `simulate`, and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use metavault_contracts::VaultConfig;

use crate::config::{
    load_vault_config, parse_address, DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE_GWEI,
    DEFAULT_TOKEN_ADDRESS,
};
use crate::logging::LogFormat;

/// MetaVault deployment tool.
///
/// Compiles the vault, signs a construction transaction, and submits it to
/// an in-process devnet. Also prints the interface description and runs
/// the reference ledger scenario.
#[derive(Parser, Debug)]
#[command(
    name = "metavault",
    about = "MetaVault custodial ledger deployment tool",
    version,
    propagate_version = true
)]
pub struct MetaVaultCli {
    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile, sign and deploy a vault; print its address.
    Deploy(DeployArgs),
    /// Print the compiled interface description as JSON.
    Interface(VaultConfigArgs),
    /// Run the reference deposit/withdraw/skim scenario and print a JSON report.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Vault configuration source shared by several subcommands.
#[derive(Args, Debug)]
pub struct VaultConfigArgs {
    /// Path to a vault configuration file (JSON). Defaults apply when omitted.
    #[arg(long, short = 'c', env = "METAVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip the `total_deposits == Σ balances` audit after each call.
    ///
    /// The audit walks every balance, so each deposit and withdraw costs
    /// time linear in the number of accounts while it is on.
    #[arg(long)]
    pub no_audit: bool,
}

impl VaultConfigArgs {
    /// Loads the configured file (or defaults) and applies flag overrides.
    pub fn load(&self) -> anyhow::Result<VaultConfig> {
        let mut config = load_vault_config(self.config.as_deref())?;
        if self.no_audit {
            config.audit_invariant = false;
        }
        Ok(config)
    }
}

/// Construction transaction gas parameters.
#[derive(Args, Debug)]
pub struct GasArgs {
    /// Gas limit for the construction transaction.
    #[arg(long, default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Gas price in gwei for the construction transaction.
    #[arg(long, default_value_t = DEFAULT_GAS_PRICE_GWEI)]
    pub gas_price_gwei: u64,
}

/// Arguments for the `deploy` subcommand.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Hex-encoded Ed25519 deployer key. The derived account becomes the
    /// vault owner. A fresh key is generated when omitted.
    ///
    /// **Never pass this flag on a shared machine**; use the environment instead.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Address of the asset contract the vault will hold. `0x` hex
    /// addresses are lower-cased; anything else is taken verbatim.
    #[arg(long, env = "TOKEN_ADDRESS", default_value = DEFAULT_TOKEN_ADDRESS, value_parser = parse_address)]
    pub token_address: String,

    #[command(flatten)]
    pub vault: VaultConfigArgs,

    #[command(flatten)]
    pub gas: GasArgs,
}

/// Arguments for the `simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub vault: VaultConfigArgs,

    #[command(flatten)]
    pub gas: GasArgs,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pub pretty: bool,
}
