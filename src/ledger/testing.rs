// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted in-process ledger for tests.
//!
//! Compiled for unit tests and behind the `testing` feature, which the
//! integration tests require.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    Account, AccountKey, Address, BlockHeader, Event, Identifier, LedgerClient, LedgerError,
    ScriptOutput, TransactionId, TransactionResult, TransactionStatus,
};
use crate::transaction::SignedTransaction;

enum Step {
    Result(TransactionResult),
    Fail(String),
}

/// Ledger double with scripted transaction results.
///
/// Each `get_transaction_result` call consumes one scripted step; the last
/// step repeats once the script is exhausted. With no steps every poll
/// reports `pending`.
pub struct ScriptedLedger {
    accounts: Mutex<HashMap<Address, Account>>,
    block: BlockHeader,
    steps: Mutex<VecDeque<Step>>,
    script_output: Mutex<String>,
    scripts: Mutex<Vec<(Vec<u8>, Vec<Vec<u8>>)>>,
    sent: Mutex<Vec<SignedTransaction>>,
    polls: AtomicUsize,
    fail_blocks: bool,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            block: BlockHeader {
                id: Identifier::new([0x11; 32]),
                height: 100,
            },
            steps: Mutex::new(VecDeque::new()),
            script_output: Mutex::new(String::from("[]")),
            scripts: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            fail_blocks: false,
        }
    }

    pub fn with_account(self, address: Address, key_index: u32, sequence_number: u64) -> Self {
        self.add_account(address, key_index, sequence_number);
        self
    }

    /// Register `address` with a single full-weight key.
    pub fn add_account(&self, address: Address, key_index: u32, sequence_number: u64) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                address,
                balance: 0,
                keys: vec![AccountKey {
                    index: key_index,
                    public_key: String::new(),
                    sequence_number,
                    weight: 1000,
                    revoked: false,
                }],
            },
        );
    }

    pub fn with_block_failure(mut self) -> Self {
        self.fail_blocks = true;
        self
    }

    pub fn block(&self) -> BlockHeader {
        self.block
    }

    pub fn push_status(&self, status: TransactionStatus) {
        self.push_result(status, None, vec![]);
    }

    pub fn script(&self, statuses: &[TransactionStatus]) {
        for &status in statuses {
            self.push_status(status);
        }
    }

    pub fn push_result(&self, status: TransactionStatus, error: Option<&str>, events: Vec<Event>) {
        self.steps.lock().unwrap().push_back(Step::Result(TransactionResult {
            status,
            error_message: error.map(str::to_string),
            events,
        }));
    }

    pub fn push_failure(&self, message: &str) {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step::Fail(message.to_string()));
    }

    pub fn set_script_output(&self, output: &str) {
        *self.script_output.lock().unwrap() = output.to_string();
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<(Vec<u8>, Vec<Vec<u8>>)> {
        self.scripts.lock().unwrap().clone()
    }
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn get_account(&self, address: Address) -> Result<Account, LedgerError> {
        self.accounts
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("account {address}")))
    }

    async fn get_latest_block_header(&self) -> Result<BlockHeader, LedgerError> {
        if self.fail_blocks {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self.block)
    }

    async fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptOutput, LedgerError> {
        self.scripts
            .lock()
            .unwrap()
            .push((script.to_vec(), arguments.to_vec()));
        Ok(ScriptOutput(self.script_output.lock().unwrap().clone()))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TransactionId, LedgerError> {
        let proposal = tx.transaction().proposal_key;
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&proposal.address) {
            for key in account.keys.iter_mut().filter(|k| k.index == proposal.key_index) {
                key.sequence_number += 1;
            }
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.id())
    }

    async fn get_transaction_result(
        &self,
        _id: &TransactionId,
    ) -> Result<TransactionResult, LedgerError> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        let mut steps = self.steps.lock().unwrap();
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            None
        };
        let current = step.as_ref().or(steps.front());

        match current {
            Some(Step::Result(result)) => Ok(result.clone()),
            Some(Step::Fail(message)) => Err(LedgerError::Transport(message.clone())),
            None => Ok(TransactionResult {
                status: TransactionStatus::Pending,
                error_message: None,
                events: vec![],
            }),
        }
    }
}
