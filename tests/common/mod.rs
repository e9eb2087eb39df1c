// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use relational_custody::ledger::{Event, Identifier};
use relational_custody::otp::{InMemorySecretStore, SecondFactorGate};
use relational_custody::transaction::TransactionEngine;
use tokio_util::sync::CancellationToken;

pub use relational_custody::ledger::testing::ScriptedLedger;

pub fn gate() -> Arc<SecondFactorGate> {
    Arc::new(SecondFactorGate::new(Arc::new(InMemorySecretStore::new())))
}

pub fn engine(ledger: Arc<ScriptedLedger>) -> Arc<TransactionEngine> {
    Arc::new(
        TransactionEngine::new(ledger, CancellationToken::new())
            .with_poll_interval(Duration::from_millis(5))
            .with_seal_timeout(Duration::from_secs(5)),
    )
}

pub fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

pub fn deposit_event() -> Event {
    Event {
        event_type: "A.4ac0ee1c903bf362.FooBarV4.Deposit".into(),
        transaction_id: Identifier::default(),
        transaction_index: 0,
        event_index: 0,
        payload: serde_json::json!({"type": "Event", "value": {"fields": []}}),
    }
}
