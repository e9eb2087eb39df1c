// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory vault for tests and local development.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::{validate_secret_id, SecretLookup, SecretVault, SecretVersion, VaultError};

/// Process-local vault. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryVault {
    secrets: DashMap<String, Vec<Vec<u8>>>,
    creates: AtomicUsize,
    reads: AtomicUsize,
    appends: AtomicUsize,
    fail_next_append: AtomicBool,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions stored under `secret_id`, if the container exists.
    pub fn version_count(&self, secret_id: &str) -> Option<usize> {
        self.secrets.get(secret_id).map(|v| v.len())
    }

    pub fn container_count(&self) -> usize {
        self.secrets.len()
    }

    /// Total create, read and append calls observed.
    pub fn operations(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
            + self.reads.load(Ordering::SeqCst)
            + self.appends.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Make the next `add_version` fail with a transport error.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretVault for InMemoryVault {
    async fn create_secret(&self, secret_id: &str) -> Result<(), VaultError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        validate_secret_id(secret_id)?;

        match self.secrets.entry(secret_id.to_string()) {
            Entry::Occupied(_) => Err(VaultError::AlreadyExists(secret_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
                Ok(())
            }
        }
    }

    async fn access_latest_version(&self, secret_id: &str) -> Result<SecretLookup, VaultError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        validate_secret_id(secret_id)?;

        let Some(versions) = self.secrets.get(secret_id) else {
            return Ok(SecretLookup::NotFound);
        };

        Ok(match versions.last() {
            Some(data) => SecretLookup::Found(SecretVersion {
                secret_id: secret_id.to_string(),
                version: versions.len() as u64,
                data: data.clone(),
            }),
            None => SecretLookup::Empty,
        })
    }

    async fn add_version(&self, secret_id: &str, data: &[u8]) -> Result<u64, VaultError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        validate_secret_id(secret_id)?;

        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(VaultError::Transport("injected append failure".into()));
        }

        let mut versions = self
            .secrets
            .get_mut(secret_id)
            .ok_or_else(|| VaultError::NotFound(secret_id.to_string()))?;
        versions.push(data.to_vec());
        Ok(versions.len() as u64)
    }
}
