// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Provisioning
//!
//! Get-or-create of a user's signing key, gated by the second factor.
//!
//! ## Flow
//!
//! 1. Validate the one-time code. Nothing touches the vault on failure.
//! 2. Read the latest version of `{user_id}-privatekey`; return it if found.
//! 3. Container missing: create it. A concurrent creator (`AlreadyExists`)
//!    triggers exactly one re-read.
//! 4. Container present but empty (an earlier append failed): continue.
//! 5. Generate key material and append it as the first version.
//!
//! Provisioning for one user is serialized within the process, so
//! concurrent requests create at most one container and one version.
//! Versions are never overwritten or deleted. A user's lock is dropped once
//! no request holds or waits on it.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ledger::Address;
use crate::otp::SecondFactorGate;
use crate::transaction::SigningAccount;
use crate::vault::{user_key_secret_id, SecretLookup, SecretVault, SecretVersion, VaultError};

pub mod keygen;

pub use keygen::{
    KeyGenerationError, KeyGenerationMode, KeyGenerator, LedgerAccountKeyGenerator,
    RandomKeyGenerator, StoredKey,
};

/// Reference to provisioned key material. Never carries the private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct KeyMaterialRef {
    pub secret_id: String,
    pub version: u64,
    #[schema(value_type = Option<String>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub public_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid second-factor code")]
    InvalidCode,

    #[error("Invalid user id: {0}")]
    InvalidUserId(VaultError),

    #[error("Vault read failed: {0}")]
    Vault(VaultError),

    #[error("Vault secret creation failed: {0}")]
    VaultCreate(VaultError),

    #[error("Vault append failed: {0}")]
    VaultAppend(VaultError),

    #[error("Key generation failed: {0}")]
    KeyGeneration(#[from] KeyGenerationError),

    #[error("Stored key is unreadable: {0}")]
    CorruptKey(String),

    #[error("No key has been provisioned for this user")]
    KeyNotProvisioned,

    #[error("The provisioned key has no ledger account")]
    NoLedgerAccount,
}

pub struct KeyProvisioner {
    vault: Arc<dyn SecretVault>,
    gate: Arc<SecondFactorGate>,
    generator: Arc<dyn KeyGenerator>,
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyProvisioner {
    pub fn new(
        vault: Arc<dyn SecretVault>,
        gate: Arc<SecondFactorGate>,
        generator: Arc<dyn KeyGenerator>,
    ) -> Self {
        Self {
            vault,
            gate,
            generator,
            user_locks: DashMap::new(),
        }
    }

    fn check_code(&self, user_id: &str, code: &str) -> Result<(), ProvisionError> {
        if self.gate.validate_code(user_id, code) {
            Ok(())
        } else {
            warn!(user_id, "Rejected second-factor code");
            Err(ProvisionError::InvalidCode)
        }
    }

    /// Return the user's key reference, creating and storing a key on first use.
    pub async fn provision_key(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<KeyMaterialRef, ProvisionError> {
        self.check_code(user_id, code)?;
        let secret_id = user_key_secret_id(user_id).map_err(ProvisionError::InvalidUserId)?;

        let lock = self.user_locks.entry(user_id.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.get_or_create(secret_id).await
        };
        drop(lock);
        self.user_locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.user_locks.len()
    }

    async fn get_or_create(&self, secret_id: String) -> Result<KeyMaterialRef, ProvisionError> {
        match self
            .vault
            .access_latest_version(&secret_id)
            .await
            .map_err(ProvisionError::Vault)?
        {
            SecretLookup::Found(version) => return reference(version),
            SecretLookup::Empty => {
                info!(%secret_id, "Secret exists without versions, resuming provisioning");
            }
            SecretLookup::NotFound => match self.vault.create_secret(&secret_id).await {
                Ok(()) => info!(%secret_id, "Created secret container"),
                Err(VaultError::AlreadyExists(_)) => {
                    warn!(%secret_id, "Secret created concurrently, re-reading");
                    return match self.vault.access_latest_version(&secret_id).await {
                        Ok(SecretLookup::Found(version)) => reference(version),
                        Ok(SecretLookup::Empty | SecretLookup::NotFound) => Err(
                            ProvisionError::VaultCreate(VaultError::AlreadyExists(secret_id)),
                        ),
                        Err(e) => Err(ProvisionError::Vault(e)),
                    };
                }
                Err(e) => return Err(ProvisionError::VaultCreate(e)),
            },
        }

        let stored = self.generator.generate().await?;
        let payload = stored
            .to_bytes()
            .map_err(|e| ProvisionError::CorruptKey(e.to_string()))?;
        let version = self
            .vault
            .add_version(&secret_id, &payload)
            .await
            .map_err(ProvisionError::VaultAppend)?;

        info!(
            %secret_id,
            version,
            address = ?stored.address,
            "Provisioned signing key"
        );
        Ok(KeyMaterialRef {
            secret_id,
            version,
            address: stored.address,
            public_key: stored.public_key,
        })
    }

    /// Latest stored key for `user_id`, after validating `code`.
    pub async fn signing_key(&self, user_id: &str, code: &str) -> Result<StoredKey, ProvisionError> {
        self.check_code(user_id, code)?;

        let secret_id = user_key_secret_id(user_id).map_err(ProvisionError::InvalidUserId)?;
        match self
            .vault
            .access_latest_version(&secret_id)
            .await
            .map_err(ProvisionError::Vault)?
        {
            SecretLookup::Found(version) => StoredKey::from_bytes(&version.data)
                .map_err(|e| ProvisionError::CorruptKey(e.to_string())),
            SecretLookup::Empty | SecretLookup::NotFound => Err(ProvisionError::KeyNotProvisioned),
        }
    }

    /// Signing account for the user's ledger account, after validating `code`.
    pub async fn signing_account(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<SigningAccount, ProvisionError> {
        self.signing_key(user_id, code)
            .await?
            .signing_account()
            .map_err(|e| ProvisionError::CorruptKey(e.to_string()))?
            .ok_or(ProvisionError::NoLedgerAccount)
    }
}

fn reference(version: SecretVersion) -> Result<KeyMaterialRef, ProvisionError> {
    let stored =
        StoredKey::from_bytes(&version.data).map_err(|e| ProvisionError::CorruptKey(e.to_string()))?;
    Ok(KeyMaterialRef {
        secret_id: version.secret_id,
        version: version.version,
        address: stored.address,
        public_key: stored.public_key,
    })
}
