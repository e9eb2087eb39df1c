// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction submission pipeline.
//!
//! The pipeline is split into small stages so each can be exercised on its own:
//!
//! - [`builder`]: reads proposer sequence number and reference block, encodes arguments
//! - [`signer`]: envelope signing over the canonical RLP form
//! - [`confirm`]: submission and polling until a terminal status
//! - [`sequencer`]: per-key serialization of build + submit
//! - [`engine`]: the facade tying the stages together

use serde::Serialize;

use crate::ledger::{
    Address, ArgumentError, Event, Identifier, LedgerError, TransactionId, TransactionStatus,
};

pub mod builder;
pub mod confirm;
pub mod engine;
pub mod rlp;
pub mod sequencer;
pub mod signer;

pub use builder::{TransactionRequest, TxBuilder};
pub use confirm::{Confirmer, DEFAULT_POLL_INTERVAL};
pub use engine::{SigningAccount, TransactionEngine, DEFAULT_SEAL_TIMEOUT};
pub use sequencer::KeySequencer;
pub use signer::{
    sign_envelope, AccountSigner, HashAlgorithm, PrivateKey, SignatureAlgorithm, SigningError,
};

/// Key used to propose a transaction and consume its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

/// A fully assembled but unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub script: Vec<u8>,
    /// JSON-Cadence encoded arguments in script parameter order.
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: Address,
    pub authorizers: Vec<Address>,
}

impl Transaction {
    /// Signing accounts in canonical order: proposer, payer, then authorizers,
    /// each address listed once.
    pub fn signers(&self) -> Vec<Address> {
        let mut out = Vec::with_capacity(2 + self.authorizers.len());
        let candidates = [self.proposal_key.address, self.payer]
            .into_iter()
            .chain(self.authorizers.iter().copied());
        for address in candidates {
            if !out.contains(&address) {
                out.push(address);
            }
        }
        out
    }

    /// Position of `address` in [`Self::signers`].
    pub fn signer_index(&self, address: Address) -> Option<u32> {
        self.signers()
            .iter()
            .position(|a| *a == address)
            .and_then(|i| u32::try_from(i).ok())
    }
}

/// A signature attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    pub signer_index: u32,
    pub key_index: u32,
    /// Raw `r || s` signature bytes.
    pub signature: Vec<u8>,
}

/// Transaction plus its payload and envelope signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: Transaction,
    payload_signatures: Vec<TransactionSignature>,
    envelope_signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn payload_signatures(&self) -> &[TransactionSignature] {
        &self.payload_signatures
    }

    pub fn envelope_signatures(&self) -> &[TransactionSignature] {
        &self.envelope_signatures
    }

    /// Attach an envelope signature, keeping signatures ordered by signer then key index.
    pub(crate) fn push_envelope_signature(&mut self, signature: TransactionSignature) {
        self.envelope_signatures.push(signature);
        self.envelope_signatures
            .sort_by_key(|s| (s.signer_index, s.key_index));
    }

    /// SHA3-256 of the canonical encoding.
    pub fn id(&self) -> TransactionId {
        rlp::transaction_id(self)
    }
}

/// Terminal result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TransactionOutcome {
    #[schema(value_type = String)]
    pub transaction_id: TransactionId,
    pub status: TransactionStatus,
    /// Execution error reported by the ledger (a sealed transaction can still fail).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub events: Vec<Event>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Sealed && self.error_message.is_none()
    }

    /// First event whose type ends with `suffix`.
    pub fn find_event(&self, suffix: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.event_type.ends_with(suffix))
    }
}

/// Errors raised while building, signing, submitting or confirming.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Remote lookup failed: {0}")]
    RemoteLookup(#[from] LedgerError),

    #[error("Argument encoding failed: {0}")]
    ArgumentEncoding(#[from] ArgumentError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Timed out waiting for transaction {id} to seal")]
    Timeout { id: TransactionId },

    #[error("Stopped waiting for transaction {id}")]
    Cancelled { id: TransactionId },

    #[error("Transaction {id} expired before it was sealed")]
    Expired { id: TransactionId },
}
