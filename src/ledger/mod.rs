// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flow ledger integration.
//!
//! This module provides:
//! - Ledger primitives (addresses, identifiers, accounts, results)
//! - The [`LedgerClient`] interface consumed by the transaction engine
//! - JSON-Cadence argument encoding
//! - A Flow Access REST implementation of the interface

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::transaction::SignedTransaction;

pub mod cadence;
pub mod network;
pub mod rest;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cadence::{Argument, ArgumentError, UFix64};
pub use network::{ContractAddresses, NetworkConfig, FLOW_EMULATOR, FLOW_MAINNET, FLOW_TESTNET};
pub use rest::FlowRestClient;

/// Errors raised while parsing ledger addresses and identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Value is {actual} bytes, expected at most {max}")]
    TooLong { actual: usize, max: usize },

    #[error("Identifier must be exactly 32 bytes, got {0}")]
    InvalidIdentifierLength(usize),
}

fn decode_hex_padded(raw: &str) -> Result<Vec<u8>, AddressError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    }
    .map_err(|e| AddressError::InvalidHex(e.to_string()))
}

/// Fixed-width (8 byte) ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address([u8; Address::LENGTH]);

impl Address {
    pub const LENGTH: usize = 8;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a hex address, with or without `0x`. Short input is left-padded.
    pub fn from_hex(raw: &str) -> Result<Self, AddressError> {
        let bytes = decode_hex_padded(raw)?;
        if bytes.len() > Self::LENGTH {
            return Err(AddressError::TooLong {
                actual: bytes.len(),
                max: Self::LENGTH,
            });
        }

        let mut out = [0u8; Self::LENGTH];
        out[Self::LENGTH - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Hex without the `0x` prefix (the Access API form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// 32-byte block or transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identifier([u8; 32]);

/// Transactions are identified by the hash of their canonical form.
pub type TransactionId = Identifier;

impl Identifier {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(raw: &str) -> Result<Self, AddressError> {
        let bytes = decode_hex_padded(raw)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidIdentifierLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A signing key registered on a ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub index: u32,
    pub public_key: String,
    pub sequence_number: u64,
    pub weight: u32,
    pub revoked: bool,
}

/// Ledger account as seen at the latest sealed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<AccountKey>,
}

impl Account {
    pub fn key(&self, index: u32) -> Option<&AccountKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub id: Identifier,
    pub height: u64,
}

/// Remotely observed transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    /// Sealed and expired are the only states a transaction never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sealed | Self::Expired)
    }

    /// Parse the Access API status string. Unrecognised values map to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "finalized" => Self::Finalized,
            "executed" => Self::Executed,
            "sealed" => Self::Sealed,
            "expired" => Self::Expired,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Finalized => "finalized",
            Self::Executed => "executed",
            Self::Sealed => "sealed",
            Self::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Event emitted by an executed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[schema(value_type = String)]
    pub transaction_id: Identifier,
    pub transaction_index: u32,
    pub event_index: u32,
    /// JSON-Cadence encoded event value.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Look up a named field of the event's JSON-Cadence payload.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload
            .get("value")?
            .get("fields")?
            .as_array()?
            .iter()
            .find(|f| f.get("name").and_then(|n| n.as_str()) == Some(name))?
            .get("value")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub error_message: Option<String>,
    pub events: Vec<Event>,
}

/// Textual rendering of a read-only script's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput(pub String);

impl ScriptOutput {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur while talking to the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid access node URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Access node returned {status}: {message}")]
    Rpc { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Remote procedure interface of the ledger access node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_account(&self, address: Address) -> Result<Account, LedgerError>;

    /// Header of the latest sealed block.
    async fn get_latest_block_header(&self) -> Result<BlockHeader, LedgerError>;

    async fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptOutput, LedgerError>;

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TransactionId, LedgerError>;

    async fn get_transaction_result(
        &self,
        id: &TransactionId,
    ) -> Result<TransactionResult, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address_is_left_padded() {
        let addr = Address::from_hex("0xAAAA").unwrap();
        assert_eq!(addr.to_string(), "0x000000000000aaaa");

        let odd = Address::from_hex("abc").unwrap();
        assert_eq!(odd.to_hex(), "0000000000000abc");
    }

    #[test]
    fn address_rejects_garbage_and_overflow() {
        assert!(matches!(
            Address::from_hex("0xzz"),
            Err(AddressError::InvalidHex(_))
        ));
        assert!(matches!(
            Address::from_hex("0x0102030405060708090a"),
            Err(AddressError::TooLong { actual: 10, max: 8 })
        ));
    }

    #[test]
    fn address_serde_uses_prefixed_hex() {
        let addr: Address = serde_json::from_str("\"4ac0ee1c903bf362\"").unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"0x4ac0ee1c903bf362\""
        );
    }

    #[test]
    fn identifier_requires_32_bytes() {
        let hex32 = "11".repeat(32);
        assert!(Identifier::from_hex(&hex32).is_ok());
        assert!(matches!(
            Identifier::from_hex("1111"),
            Err(AddressError::InvalidIdentifierLength(2))
        ));
    }

    #[test]
    fn only_sealed_and_expired_are_terminal() {
        assert!(TransactionStatus::Sealed.is_terminal());
        assert!(TransactionStatus::Expired.is_terminal());
        assert!(!TransactionStatus::Executed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert_eq!(TransactionStatus::parse("SEALED"), TransactionStatus::Sealed);
        assert_eq!(TransactionStatus::parse("??"), TransactionStatus::Unknown);
    }

    #[test]
    fn event_field_reads_cadence_payload() {
        let event = Event {
            event_type: "flow.AccountCreated".into(),
            transaction_id: Identifier::default(),
            transaction_index: 0,
            event_index: 0,
            payload: serde_json::json!({
                "type": "Event",
                "value": {
                    "id": "flow.AccountCreated",
                    "fields": [
                        {"name": "address", "value": {"type": "Address", "value": "0x01cf0e2f2f715450"}}
                    ]
                }
            }),
        };

        let field = event.field("address").unwrap();
        assert_eq!(field["value"], "0x01cf0e2f2f715450");
        assert!(event.field("missing").is_none());
    }
}
