// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-key submission ordering.
//!
//! Two transactions proposed with the same account key within one process
//! would otherwise read the same sequence number and one of them would be
//! rejected. Holding the key's lock from build until submission removes
//! that race; the wait for sealing happens outside the lock. Entries are
//! dropped once no caller holds or waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ledger::Address;

type KeyId = (Address, u32);

#[derive(Default)]
pub struct KeySequencer {
    locks: DashMap<KeyId, Arc<Mutex<()>>>,
}

/// Held lock on one account key.
pub struct KeyGuard<'a> {
    sequencer: &'a KeySequencer,
    key: KeyId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // The guard owns one reference; release it before counting.
        self.guard.take();
        self.sequencer
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl KeySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `address`/`key_index`. Released when the guard drops.
    pub async fn lock(&self, address: Address, key_index: u32) -> KeyGuard<'_> {
        let key = (address, key_index);
        let lock = self.locks.entry(key).or_default().clone();
        KeyGuard {
            sequencer: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of keys currently locked or contended.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let sequencer = Arc::new(KeySequencer::new());
        let address = Address::from_hex("0x01").unwrap();

        let guard = sequencer.lock(address, 0).await;
        let contender = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move {
                let _guard = sequencer.lock(address, 0).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(sequencer.is_empty());
    }

    #[tokio::test]
    async fn released_keys_are_forgotten() {
        let sequencer = Arc::new(KeySequencer::new());
        let address = Address::from_hex("0x01").unwrap();

        let tasks: Vec<_> = (0..8u32)
            .map(|i| {
                let sequencer = sequencer.clone();
                tokio::spawn(async move {
                    let _guard = sequencer.lock(address, i % 2).await;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(sequencer.is_empty());

        let held = sequencer.lock(address, 0).await;
        assert_eq!(sequencer.len(), 1);
        drop(held);
        assert!(sequencer.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let sequencer = KeySequencer::new();
        let address = Address::from_hex("0x01").unwrap();

        let _a = sequencer.lock(address, 0).await;
        let _b = sequencer.lock(address, 1).await;
        let _c = sequencer.lock(Address::from_hex("0x02").unwrap(), 0).await;
    }
}
