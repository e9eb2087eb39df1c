// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret vault adapters.
//!
//! A vault holds named secret containers, each with an ordered list of
//! immutable versions numbered from 1. The service only ever needs three
//! operations: create a container, read its latest version, append a version.
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`InMemoryVault`] | tests and local development |
//! | [`FsVault`] | single-node deployments (one directory per secret) |
//! | [`GcpSecretManager`] | Google Secret Manager over REST |

use async_trait::async_trait;

pub mod fs;
pub mod gcp;
pub mod memory;

pub use fs::FsVault;
pub use gcp::{AccessTokenSource, DefaultCredentials, GcpSecretManager, StaticToken};
pub use memory::InMemoryVault;

/// Maximum secret id length accepted by every backend.
pub const MAX_SECRET_ID_LEN: usize = 255;

/// Errors returned by vault backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid secret id: {0}")]
    InvalidSecretId(String),

    #[error("Vault transport error: {0}")]
    Transport(String),
}

/// One stored version of a secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretVersion {
    pub secret_id: String,
    pub version: u64,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for SecretVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVersion")
            .field("secret_id", &self.secret_id)
            .field("version", &self.version)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

/// Result of reading the latest version of a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretLookup {
    Found(SecretVersion),
    /// The container exists but holds no versions.
    Empty,
    NotFound,
}

/// External secret store contract.
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Create an empty container. Fails with [`VaultError::AlreadyExists`] if present.
    async fn create_secret(&self, secret_id: &str) -> Result<(), VaultError>;

    async fn access_latest_version(&self, secret_id: &str) -> Result<SecretLookup, VaultError>;

    /// Append a version and return its number.
    async fn add_version(&self, secret_id: &str, data: &[u8]) -> Result<u64, VaultError>;
}

const USER_KEY_SUFFIX: &str = "-privatekey";

/// Container name holding a user's signing key.
///
/// ASCII letters, digits and `-` pass through; every other byte of the user
/// id (`_` included) becomes `_xx` in lowercase hex, so distinct user ids
/// never share a container. Fails when the result is not a valid secret id.
pub fn user_key_secret_id(user_id: &str) -> Result<String, VaultError> {
    if user_id.is_empty() {
        return Err(VaultError::InvalidSecretId("empty user id".to_string()));
    }
    let mut secret_id = String::with_capacity(user_id.len() + USER_KEY_SUFFIX.len());
    for b in user_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            secret_id.push(char::from(b));
        } else {
            secret_id.push_str(&format!("_{b:02x}"));
        }
    }
    secret_id.push_str(USER_KEY_SUFFIX);
    validate_secret_id(&secret_id)?;
    Ok(secret_id)
}

/// Secret ids are limited to `[A-Za-z0-9_-]`, 1 to 255 characters.
pub fn validate_secret_id(secret_id: &str) -> Result<(), VaultError> {
    let valid = !secret_id.is_empty()
        && secret_id.len() <= MAX_SECRET_ID_LEN
        && secret_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(VaultError::InvalidSecretId(format!("{secret_id:?}")))
    }
}
