//! # Construction Transaction Signing
//!
//! The deployer identity is an Ed25519 keypair. Its account is derived
//! from the verifying key, so the owner a vault records is exactly the key
//! that signed its construction.
//!
//! Key bytes are never logged or serialized. Load them explicitly with
//! [`DeployerKey::from_hex`].

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use metavault_contracts::{Account, AssetHandle};

use crate::compiler::Artifact;
use crate::config::CONSTRUCTION_DOMAIN;

/// Errors from key loading and signature checks. Deliberately vague about
/// the key material involved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key: expected 32 hex-encoded bytes")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature does not verify")]
    BadSignature,
}

/// Derives an account from a verifying key: `0x` + the last 20 bytes of
/// its SHA-256.
pub fn account_for(verifying_key: &VerifyingKey) -> Account {
    let digest = Sha256::digest(verifying_key.as_bytes());
    Account::new(format!("0x{}", hex::encode(&digest[12..])))
}

/// The deployer's signing identity.
pub struct DeployerKey {
    signing_key: SigningKey,
}

impl fmt::Debug for DeployerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployerKey")
            .field("account", &self.account())
            .finish_non_exhaustive()
    }
}

impl DeployerKey {
    /// Fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Key from a hex-encoded 32-byte secret, with or without `0x`.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let trimmed = hex_str.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|_| KeyError::InvalidSecretKey)?;
        let secret: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    pub fn account(&self) -> Account {
        account_for(&self.signing_key.verifying_key())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Signs a construction transaction.
    pub fn sign(&self, tx: ConstructionTx) -> SignedConstructionTx {
        let signature = self.signing_key.sign(&tx.signing_payload());
        SignedConstructionTx {
            tx,
            public_key: self.public_key_hex(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

/// Unsigned request to construct a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionTx {
    /// Deployer account; becomes the vault owner.
    pub from: Account,
    /// Deployer's transaction count at submission.
    pub nonce: u64,
    /// Constructor argument.
    pub asset: AssetHandle,
    /// The code being deployed.
    pub artifact: Artifact,
    pub gas_limit: u64,
    pub gas_price_gwei: u64,
}

impl ConstructionTx {
    /// Bytes covered by the signature. Commits to the artifact through its
    /// code hash.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(CONSTRUCTION_DOMAIN);
        for field in [
            self.from.as_str(),
            self.asset.as_str(),
            self.artifact.code_hash.as_str(),
        ] {
            payload.extend_from_slice(&(field.len() as u32).to_be_bytes());
            payload.extend_from_slice(field.as_bytes());
        }
        payload.extend_from_slice(&self.nonce.to_be_bytes());
        payload.extend_from_slice(&self.gas_limit.to_be_bytes());
        payload.extend_from_slice(&self.gas_price_gwei.to_be_bytes());
        payload
    }
}

/// A construction transaction with its signature attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedConstructionTx {
    pub tx: ConstructionTx,
    /// Hex Ed25519 verifying key.
    pub public_key: String,
    /// Hex Ed25519 signature over [`ConstructionTx::signing_payload`].
    pub signature: String,
}

impl SignedConstructionTx {
    /// Checks the signature and that `tx.from` is the signer's account.
    pub fn verify(&self) -> Result<(), KeyError> {
        let key_bytes: [u8; 32] = hex::decode(&self.public_key)
            .map_err(|_| KeyError::InvalidPublicKey)?
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        let verifying_key =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| KeyError::InvalidPublicKey)?;

        if account_for(&verifying_key) != self.tx.from {
            return Err(KeyError::BadSignature);
        }

        let sig_bytes = hex::decode(&self.signature).map_err(|_| KeyError::BadSignature)?;
        let signature = Signature::from_slice(&sig_bytes).map_err(|_| KeyError::BadSignature)?;
        verifying_key
            .verify(&self.tx.signing_payload(), &signature)
            .map_err(|_| KeyError::BadSignature)
    }

    /// Hex SHA-256 over the payload and signature.
    pub fn tx_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.tx.signing_payload());
        hasher.update(self.signature.as_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ContractCompiler, ContractSource, NativeCompiler};
    use metavault_contracts::VaultConfig;

    fn tx_for(key: &DeployerKey) -> ConstructionTx {
        ConstructionTx {
            from: key.account(),
            nonce: 0,
            asset: AssetHandle::new("0xt"),
            artifact: NativeCompiler
                .compile(&ContractSource::metavault(VaultConfig::default()))
                .unwrap(),
            gas_limit: 500_000,
            gas_price_gwei: 50,
        }
    }

    #[test]
    fn signed_tx_verifies() {
        let key = DeployerKey::generate();
        let signed = key.sign(tx_for(&key));
        signed.verify().unwrap();
        assert!(signed.tx_hash().starts_with("0x"));
    }

    #[test]
    fn tampered_nonce_fails_verification() {
        let key = DeployerKey::generate();
        let mut signed = key.sign(tx_for(&key));
        signed.tx.nonce = 1;
        assert_eq!(signed.verify(), Err(KeyError::BadSignature));
    }

    #[test]
    fn foreign_sender_fails_verification() {
        let key = DeployerKey::generate();
        let mut tx = tx_for(&key);
        tx.from = Account::new("0xsomeoneelse");
        assert_eq!(key.sign(tx).verify(), Err(KeyError::BadSignature));
    }

    #[test]
    fn hex_key_round_trips_account() {
        let secret = "0x".to_string() + &"11".repeat(32);
        let a = DeployerKey::from_hex(&secret).unwrap();
        let b = DeployerKey::from_hex(&"11".repeat(32)).unwrap();
        assert_eq!(a.account(), b.account());
        assert_eq!(a.account().as_str().len(), 42);
    }

    #[test]
    fn short_hex_key_rejected() {
        assert_eq!(
            DeployerKey::from_hex("abcd").unwrap_err(),
            KeyError::InvalidSecretKey
        );
    }

    #[test]
    fn debug_does_not_print_secret() {
        let key = DeployerKey::from_hex(&"22".repeat(32)).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(&"22".repeat(32)));
    }
}
