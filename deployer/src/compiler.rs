//! # Contract Compiler
//!
//! Turns a contract source into something a submitter can deploy: an
//! interface description (entry points, their arguments and mutability)
//! and a code hash that the construction transaction commits to.
//!
//! The vault is native Rust, so [`NativeCompiler`] does not translate
//! anything. It describes the [`MetaVault`](metavault_contracts::MetaVault)
//! surface and fingerprints the exact build and configuration being
//! deployed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use metavault_contracts::config::{CONTRACT_NAME, INTERFACE_VERSION};
use metavault_contracts::VaultConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler does not know how to build this contract.
    #[error("unknown contract: {0}")]
    UnknownContract(String),

    /// The configuration could not be encoded into the artifact.
    #[error("failed to encode contract configuration: {0}")]
    Encoding(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What to compile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSource {
    /// Contract name. Must be [`CONTRACT_NAME`] for the native compiler.
    pub name: String,
    /// Settings baked into every instance built from this source.
    pub config: VaultConfig,
}

impl ContractSource {
    pub fn metavault(config: VaultConfig) -> Self {
        Self {
            name: CONTRACT_NAME.to_string(),
            config,
        }
    }
}

/// How an entry point may affect state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    Constructor,
    Mutating,
    View,
}

/// A named, typed argument or return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }
}

/// One callable surface of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub mutability: Mutability,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    /// Failure reasons the entry point may abort with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Compiled contract: interface description plus code fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub contract: String,
    pub interface_version: String,
    pub compiler_version: String,
    pub config: VaultConfig,
    pub entry_points: Vec<EntryPoint>,
    /// Hex SHA-256 over the fields above.
    pub code_hash: String,
}

impl Artifact {
    /// Recomputes the code hash from the artifact's contents.
    pub fn compute_hash(&self) -> Result<String, CompileError> {
        let mut hasher = Sha256::new();
        hasher.update(self.contract.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.interface_version.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.compiler_version.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(&self.config)?);
        hasher.update(serde_json::to_vec(&self.entry_points)?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Whether `code_hash` matches the contents.
    pub fn is_intact(&self) -> bool {
        matches!(self.compute_hash(), Ok(hash) if hash == self.code_hash)
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.name == name)
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Produces deployable artifacts from contract sources.
pub trait ContractCompiler {
    fn compile(&self, source: &ContractSource) -> Result<Artifact, CompileError>;
}

/// Compiler for the native Rust vault.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCompiler;

impl ContractCompiler for NativeCompiler {
    fn compile(&self, source: &ContractSource) -> Result<Artifact, CompileError> {
        if source.name != CONTRACT_NAME {
            return Err(CompileError::UnknownContract(source.name.clone()));
        }

        let mut artifact = Artifact {
            contract: source.name.clone(),
            interface_version: INTERFACE_VERSION.to_string(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            config: source.config.clone(),
            entry_points: metavault_interface(),
            code_hash: String::new(),
        };
        artifact.code_hash = artifact.compute_hash()?;

        tracing::debug!(
            contract = %artifact.contract,
            code_hash = %artifact.code_hash,
            entry_points = artifact.entry_points.len(),
            "contract compiled"
        );
        Ok(artifact)
    }
}

fn metavault_interface() -> Vec<EntryPoint> {
    let amount = || vec![Param::new("amount", "uint128")];
    let entry = |name: &str, mutability, inputs, outputs, errors: &[&str]| EntryPoint {
        name: name.to_string(),
        mutability,
        inputs,
        outputs,
        errors: errors.iter().map(|e| e.to_string()).collect(),
    };

    vec![
        entry(
            "constructor",
            Mutability::Constructor,
            vec![Param::new("asset", "address")],
            vec![],
            &["AssetMismatch"],
        ),
        entry(
            "deposit",
            Mutability::Mutating,
            amount(),
            vec![],
            &["TransferFailed", "Overflow", "Reentrancy"],
        ),
        entry(
            "withdraw",
            Mutability::Mutating,
            amount(),
            vec![],
            &["InsufficientBalance", "TransferFailed", "Reentrancy"],
        ),
        entry(
            "skim",
            Mutability::Mutating,
            amount(),
            vec![],
            &["NotOwner", "TransferFailed", "Reentrancy"],
        ),
        entry(
            "balances",
            Mutability::View,
            vec![Param::new("account", "address")],
            vec![Param::new("balance", "uint128")],
            &[],
        ),
        entry(
            "total_deposits",
            Mutability::View,
            vec![],
            vec![Param::new("total", "uint128")],
            &[],
        ),
        entry(
            "asset",
            Mutability::View,
            vec![],
            vec![Param::new("asset", "address")],
            &[],
        ),
        entry(
            "owner",
            Mutability::View,
            vec![],
            vec![Param::new("owner", "address")],
            &[],
        ),
    ]
}
