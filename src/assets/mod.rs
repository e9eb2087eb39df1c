// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ticket NFT and FlowToken operations.
//!
//! Transactions go through the [`TransactionEngine`] and resolve once sealed.
//! Listings run read-only scripts and decode their textual output.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ledger::{
    Address, Argument, ArgumentError, ContractAddresses, LedgerClient, LedgerError, UFix64,
};
use crate::transaction::{
    SigningAccount, TransactionEngine, TransactionError, TransactionOutcome, TransactionRequest,
};

pub mod parser;
pub mod scripts;

pub use parser::{parse_displays, parse_records, NftDisplay, NftRecord};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Script execution failed: {0}")]
    Script(#[from] LedgerError),

    #[error("Argument encoding failed: {0}")]
    Argument(#[from] ArgumentError),

    /// Sealed, but the ledger reported an execution error.
    #[error("Transaction {transaction_id} failed: {message}")]
    ExecutionFailed {
        transaction_id: String,
        message: String,
    },
}

/// NFT fields supplied by the minter.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub recipient: Address,
    pub name: String,
    pub description: String,
    pub url: String,
    /// Grants the organizer role.
    pub role: bool,
}

pub struct AssetService {
    engine: Arc<TransactionEngine>,
    ledger: Arc<dyn LedgerClient>,
    contracts: ContractAddresses,
}

impl AssetService {
    pub fn new(
        engine: Arc<TransactionEngine>,
        ledger: Arc<dyn LedgerClient>,
        contracts: ContractAddresses,
    ) -> Self {
        Self {
            engine,
            ledger,
            contracts,
        }
    }

    /// Create and publish an empty ticket collection. No-op on the ledger if
    /// one already exists.
    pub async fn setup_collection(
        &self,
        account: &SigningAccount,
    ) -> Result<TransactionOutcome, AssetError> {
        let request = TransactionRequest::single_signer(
            scripts::render(scripts::SETUP_COLLECTION, &self.contracts),
            account.address,
            account.key_index,
        )
        .gas_limit(scripts::SETUP_COLLECTION_GAS_LIMIT);

        self.run("setup_collection", request, account).await
    }

    pub async fn mint_nft(
        &self,
        minter: &SigningAccount,
        mint: MintRequest,
    ) -> Result<TransactionOutcome, AssetError> {
        let request = TransactionRequest::single_signer(
            scripts::render(scripts::MINT_NFT, &self.contracts),
            minter.address,
            minter.key_index,
        )
        .gas_limit(scripts::MINT_GAS_LIMIT)
        .argument(Argument::Address(mint.recipient))
        .argument(Argument::String(mint.name))
        .argument(Argument::String(mint.description))
        .argument(Argument::String(mint.url))
        .argument(Argument::Bool(mint.role));

        self.run("mint_nft", request, minter).await
    }

    pub async fn transfer_tokens(
        &self,
        sender: &SigningAccount,
        amount: UFix64,
        to: Address,
    ) -> Result<TransactionOutcome, AssetError> {
        let request = TransactionRequest::single_signer(
            scripts::render(scripts::TRANSFER_FLOW, &self.contracts),
            sender.address,
            sender.key_index,
        )
        .gas_limit(scripts::TRANSFER_GAS_LIMIT)
        .argument(Argument::UFix64(amount))
        .argument(Argument::Address(to));

        self.run("transfer_tokens", request, sender).await
    }

    /// Tickets owned by `owner`. Unparseable entries are dropped.
    pub async fn list_nfts(&self, owner: Address) -> Result<Vec<NftRecord>, AssetError> {
        let output = self.query(scripts::GET_NFTS, owner).await?;
        let records = parse_records(&output);
        if records.is_empty() && output.trim() != "[]" {
            warn!(%owner, "NFT listing produced no decodable records");
        }
        debug!(%owner, count = records.len(), "Listed NFTs");
        Ok(records)
    }

    /// Display views of the tickets owned by `owner`.
    pub async fn list_displays(&self, owner: Address) -> Result<Vec<NftDisplay>, AssetError> {
        let output = self.query(scripts::GET_NFT_DISPLAYS, owner).await?;
        Ok(parse_displays(&output))
    }

    async fn query(&self, template: &str, owner: Address) -> Result<String, AssetError> {
        let script = scripts::render(template, &self.contracts);
        let arguments = vec![Argument::Address(owner).encode()?];
        let output = self
            .ledger
            .execute_script(script.as_bytes(), &arguments)
            .await?;
        Ok(output.0)
    }

    async fn run(
        &self,
        operation: &'static str,
        request: TransactionRequest,
        account: &SigningAccount,
    ) -> Result<TransactionOutcome, AssetError> {
        let outcome = self.engine.execute(request, account).await?;

        if let Some(message) = &outcome.error_message {
            warn!(operation, tx_id = %outcome.transaction_id, error = %message, "Transaction sealed with error");
            return Err(AssetError::ExecutionFailed {
                transaction_id: outcome.transaction_id.to_string(),
                message: message.clone(),
            });
        }

        info!(
            operation,
            tx_id = %outcome.transaction_id,
            events = outcome.events.len(),
            "Transaction sealed"
        );
        Ok(outcome)
    }
}
