// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building against live ledger state.
//!
//! The proposer's sequence number and the reference block are read from the
//! ledger immediately before building and never cached.

use std::sync::Arc;

use tracing::debug;

use super::{ProposalKey, Transaction, TransactionError};
use crate::ledger::{Address, Argument, LedgerClient, LedgerError};

/// Default computation limit for simple transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 100;

/// Everything needed to build a transaction except remote state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub script: String,
    pub arguments: Vec<Argument>,
    pub gas_limit: u64,
    pub proposer: Address,
    pub proposer_key_index: u32,
    pub payer: Address,
    pub authorizers: Vec<Address>,
}

impl TransactionRequest {
    pub fn new(script: impl Into<String>, proposer: Address) -> Self {
        Self {
            script: script.into(),
            arguments: Vec::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            proposer,
            proposer_key_index: 0,
            payer: proposer,
            authorizers: Vec::new(),
        }
    }

    /// Proposer, payer and sole authorizer are the same account key.
    pub fn single_signer(script: impl Into<String>, account: Address, key_index: u32) -> Self {
        Self::new(script, account)
            .key_index(key_index)
            .authorizer(account)
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn key_index(mut self, key_index: u32) -> Self {
        self.proposer_key_index = key_index;
        self
    }

    pub fn payer(mut self, payer: Address) -> Self {
        self.payer = payer;
        self
    }

    pub fn authorizer(mut self, authorizer: Address) -> Self {
        self.authorizers.push(authorizer);
        self
    }
}

/// Builds unsigned transactions.
#[derive(Clone)]
pub struct TxBuilder {
    ledger: Arc<dyn LedgerClient>,
}

impl TxBuilder {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Assemble an unsigned transaction. Performs no signing and no submission.
    pub async fn build(&self, request: TransactionRequest) -> Result<Transaction, TransactionError> {
        let account = self.ledger.get_account(request.proposer).await?;
        let key = account
            .key(request.proposer_key_index)
            .filter(|k| !k.revoked)
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "key {} of {} is missing or revoked",
                    request.proposer_key_index, request.proposer
                ))
            })?;
        let sequence_number = key.sequence_number;

        let block = self.ledger.get_latest_block_header().await?;

        let arguments = request
            .arguments
            .iter()
            .map(Argument::encode)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            proposer = %request.proposer,
            key_index = request.proposer_key_index,
            sequence_number,
            reference_block = block.height,
            "Built transaction"
        );

        Ok(Transaction {
            script: request.script.into_bytes(),
            arguments,
            reference_block_id: block.id,
            gas_limit: request.gas_limit,
            proposal_key: ProposalKey {
                address: request.proposer,
                key_index: request.proposer_key_index,
                sequence_number,
            },
            payer: request.payer,
            authorizers: request.authorizers,
        })
    }
}
