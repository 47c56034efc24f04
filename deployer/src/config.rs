//! # Deployment Configuration & Constants
//!
//! Defaults for the construction transaction and loading of the vault
//! configuration file. Gas values are carried in the signed transaction
//! for fidelity with real submitters; the devnet does not meter them.

use std::path::Path;

use anyhow::{Context, Result};

use metavault_contracts::VaultConfig;

/// Gas limit put on construction transactions unless overridden.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Gas price in gwei put on construction transactions unless overridden.
pub const DEFAULT_GAS_PRICE_GWEI: u64 = 50;

/// Asset handle used when no `TOKEN_ADDRESS` is given.
pub const DEFAULT_TOKEN_ADDRESS: &str = "0x00000000000000000000000000000000000000e2";

/// Domain tag prefixed to every signed construction payload, so a
/// signature over one can never be replayed as anything else.
pub const CONSTRUCTION_DOMAIN: &[u8] = b"metavault/construct/v1";

/// Normalizes an address given on the command line. Surrounding
/// whitespace is dropped and `0x` hex addresses are lower-cased so
/// `0xAB..` and `0xab..` name the same contract. Other identity schemes
/// are case-sensitive and pass through unchanged.
pub fn parse_address(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("address must not be empty".to_owned());
    }
    let is_hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()));
    if is_hex {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Ok(trimmed.to_owned())
    }
}

/// Loads a [`VaultConfig`] from a JSON file, or the default when `path`
/// is `None`.
pub fn load_vault_config(path: Option<&Path>) -> Result<VaultConfig> {
    let Some(path) = path else {
        return Ok(VaultConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read vault config {}", path.display()))?;
    let config = VaultConfig::from_json(&raw)
        .with_context(|| format!("invalid vault config {}", path.display()))?;

    tracing::debug!(path = %path.display(), ?config, "vault config loaded");
    Ok(config)
}
