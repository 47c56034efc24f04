//! # Vault Configuration & Constants
//!
//! Knobs that change how a vault defends itself, never what its
//! transitions mean. A vault built with every default is the one the
//! deployer ships; the switches exist so tests can take a layer away and
//! show the layer underneath still holds.

use serde::{Deserialize, Serialize};

/// Contract name reported in interface descriptions and deployment logs.
pub const CONTRACT_NAME: &str = "MetaVault";

/// Version of the public entry-point surface. Bump when an entry point's
/// arguments or failure reasons change.
pub const INTERFACE_VERSION: &str = "1.0.0";

/// Default bound on the in-memory event log.
pub const DEFAULT_MAX_EVENTS: usize = 1024;

/// Per-vault settings. Every field has a default, so `{}` is a valid
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Reject any entry point invoked while another transition on the same
    /// vault is still in progress.
    ///
    /// Turning this off does not make withdrawals unsafe: the debit still
    /// happens before the push. It only removes the second line.
    pub reentrancy_guard: bool,

    /// Recompute `Σ balances` after every outermost transition and abort
    /// if it disagrees with `total_deposits`. Linear in the number of
    /// accounts.
    pub audit_invariant: bool,

    /// Maximum number of events kept in memory. Oldest are dropped first.
    /// `0` disables the log.
    pub max_events: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            reentrancy_guard: true,
            audit_invariant: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl VaultConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Configuration with the reentrancy guard switched off, leaving the
    /// ordering discipline as the only protection.
    pub fn unguarded() -> Self {
        Self {
            reentrancy_guard: false,
            ..Self::default()
        }
    }
}
