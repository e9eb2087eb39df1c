// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage for per-user TOTP secrets.

use dashmap::{mapref::entry::Entry, DashMap};

/// Per-user shared secret table.
pub trait SecretStore: Send + Sync {
    fn get(&self, user_id: &str) -> Option<Vec<u8>>;

    /// Insert `secret` only if the user has none. Returns whether it was stored.
    fn insert_new(&self, user_id: &str, secret: Vec<u8>) -> bool;

    /// Insert or replace the user's secret.
    fn put(&self, user_id: &str, secret: Vec<u8>);
}

/// Process-local secret table. Enrollments do not survive a restart.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<String, Vec<u8>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, user_id: &str) -> Option<Vec<u8>> {
        self.secrets.get(user_id).map(|s| s.value().clone())
    }

    fn insert_new(&self, user_id: &str, secret: Vec<u8>) -> bool {
        match self.secrets.entry(user_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(secret);
                true
            }
        }
    }

    fn put(&self, user_id: &str, secret: Vec<u8>) {
        self.secrets.insert(user_id.to_string(), secret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_new_keeps_the_first_secret() {
        let store = InMemorySecretStore::new();
        assert!(store.insert_new("7", vec![1]));
        assert!(!store.insert_new("7", vec![2]));
        assert_eq!(store.get("7"), Some(vec![1]));

        store.put("7", vec![3]);
        assert_eq!(store.get("7"), Some(vec![3]));
        assert_eq!(store.len(), 1);
    }
}
