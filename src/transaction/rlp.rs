// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical RLP forms of a transaction.
//!
//! ```text
//! payload  = [script, [args..], ref_block_id, gas_limit,
//!             proposer, proposer_key_index, proposer_seq, payer, [authorizers..]]
//! envelope = [payload, [payload_sigs..]]
//! full     = [payload, [payload_sigs..], [envelope_sigs..]]
//! sig      = [signer_index, key_index, signature]
//! ```

use alloy_rlp::{Encodable, Header};
use sha3::{Digest, Sha3_256};

use super::{SignedTransaction, Transaction, TransactionSignature};
use crate::ledger::{Identifier, TransactionId};

/// Domain separation tag prepended to every transaction signing message.
pub const TRANSACTION_DOMAIN_TAG: &[u8] = b"FLOW-V0.0-transaction";

/// Incrementally encoded RLP list.
#[derive(Default)]
struct List(Vec<u8>);

impl List {
    fn bytes(mut self, value: &[u8]) -> Self {
        value.encode(&mut self.0);
        self
    }

    fn uint(mut self, value: u64) -> Self {
        value.encode(&mut self.0);
        self
    }

    /// Append an already encoded item.
    fn item(mut self, encoded: &[u8]) -> Self {
        self.0.extend_from_slice(encoded);
        self
    }

    fn finish(self) -> Vec<u8> {
        let header = Header {
            list: true,
            payload_length: self.0.len(),
        };
        let mut out = Vec::with_capacity(header.length() + self.0.len());
        header.encode(&mut out);
        out.extend_from_slice(&self.0);
        out
    }
}

pub fn encode_payload(tx: &Transaction) -> Vec<u8> {
    let arguments = tx
        .arguments
        .iter()
        .fold(List::default(), |list, arg| list.bytes(arg))
        .finish();
    let authorizers = tx
        .authorizers
        .iter()
        .fold(List::default(), |list, a| list.bytes(a.as_bytes()))
        .finish();

    List::default()
        .bytes(&tx.script)
        .item(&arguments)
        .bytes(tx.reference_block_id.as_bytes())
        .uint(tx.gas_limit)
        .bytes(tx.proposal_key.address.as_bytes())
        .uint(u64::from(tx.proposal_key.key_index))
        .uint(tx.proposal_key.sequence_number)
        .bytes(tx.payer.as_bytes())
        .item(&authorizers)
        .finish()
}

fn encode_signatures(signatures: &[TransactionSignature]) -> Vec<u8> {
    signatures
        .iter()
        .fold(List::default(), |list, sig| {
            let encoded = List::default()
                .uint(u64::from(sig.signer_index))
                .uint(u64::from(sig.key_index))
                .bytes(&sig.signature)
                .finish();
            list.item(&encoded)
        })
        .finish()
}

/// Bytes covered by envelope signatures.
pub fn encode_envelope(signed: &SignedTransaction) -> Vec<u8> {
    List::default()
        .item(&encode_payload(signed.transaction()))
        .item(&encode_signatures(signed.payload_signatures()))
        .finish()
}

/// Tag padded to 32 bytes followed by the envelope encoding.
pub fn envelope_message(signed: &SignedTransaction) -> Vec<u8> {
    let mut message = domain_tag().to_vec();
    message.extend_from_slice(&encode_envelope(signed));
    message
}

pub fn domain_tag() -> [u8; 32] {
    let mut tag = [0u8; 32];
    tag[..TRANSACTION_DOMAIN_TAG.len()].copy_from_slice(TRANSACTION_DOMAIN_TAG);
    tag
}

pub fn transaction_id(signed: &SignedTransaction) -> TransactionId {
    let encoded = List::default()
        .item(&encode_payload(signed.transaction()))
        .item(&encode_signatures(signed.payload_signatures()))
        .item(&encode_signatures(signed.envelope_signatures()))
        .finish();
    Identifier::new(Sha3_256::digest(&encoded).into())
}
