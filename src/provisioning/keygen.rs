// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material generation strategies.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ledger::{Address, Argument, UFix64};
use crate::transaction::{
    AccountSigner, HashAlgorithm, PrivateKey, SignatureAlgorithm, SigningAccount, SigningError,
    TransactionEngine, TransactionError, TransactionRequest,
};

/// Weight giving a single key full control of its account.
pub const FULL_KEY_WEIGHT: &str = "1000.0";

/// Gas limit of the account-creation transaction.
pub const CREATE_ACCOUNT_GAS_LIMIT: u64 = 999;

const CREATE_ACCOUNT_SCRIPT: &str = r#"
transaction(publicKey: String, signatureAlgorithm: UInt8, hashAlgorithm: UInt8, weight: UFix64) {
    prepare(signer: auth(BorrowValue) &Account) {
        let key = PublicKey(
            publicKey: publicKey.decodeHex(),
            signatureAlgorithm: SignatureAlgorithm(rawValue: signatureAlgorithm)
                ?? panic("Unsupported signature algorithm")
        )

        let account = Account(payer: signer)
        account.keys.add(
            publicKey: key,
            hashAlgorithm: HashAlgorithm(rawValue: hashAlgorithm)
                ?? panic("Unsupported hash algorithm"),
            weight: weight
        )
    }
}
"#;

/// Key payload persisted as one vault version.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredKey {
    pub private_key: String,
    pub public_key: String,
    pub signature_algorithm: SignatureAlgorithm,
    pub hash_algorithm: HashAlgorithm,
    /// Ledger account controlled by the key. Absent for locally generated keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
}

impl StoredKey {
    pub fn new(key: &PrivateKey, hash_algorithm: HashAlgorithm, address: Option<Address>) -> Self {
        Self {
            private_key: key.to_hex(),
            public_key: key.public_key_hex(),
            signature_algorithm: key.algorithm(),
            hash_algorithm,
            address,
            created_at: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn signer(&self) -> Result<AccountSigner, SigningError> {
        Ok(AccountSigner {
            key: PrivateKey::from_hex_for(self.signature_algorithm, &self.private_key)?,
            signature_algorithm: self.signature_algorithm,
            hash_algorithm: self.hash_algorithm,
        })
    }

    /// Signing account for the key's ledger account (always key index 0).
    pub fn signing_account(&self) -> Result<Option<SigningAccount>, SigningError> {
        let Some(address) = self.address else {
            return Ok(None);
        };
        Ok(Some(SigningAccount {
            address,
            key_index: 0,
            signer: self.signer()?,
        }))
    }
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("public_key", &self.public_key)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Errors from key generation strategies.
#[derive(Debug, thiserror::Error)]
pub enum KeyGenerationError {
    #[error("Account creation failed: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Account creation transaction failed: {0}")]
    Execution(String),

    #[error("Account creation emitted no AccountCreated event")]
    MissingAccountCreatedEvent,

    #[error("Argument error: {0}")]
    Argument(#[from] crate::ledger::ArgumentError),
}

/// Which strategy produces new key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyGenerationMode {
    /// Create a ledger account controlled by the new key.
    Ledger,
    /// Local key only, no ledger account.
    #[default]
    Random,
}

impl FromStr for KeyGenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ledger" => Ok(Self::Ledger),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown key generation mode: {other}")),
        }
    }
}

#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self) -> Result<StoredKey, KeyGenerationError>;
}

/// Fresh secp256k1 key from OS randomness.
#[derive(Debug, Default)]
pub struct RandomKeyGenerator;

#[async_trait]
impl KeyGenerator for RandomKeyGenerator {
    async fn generate(&self) -> Result<StoredKey, KeyGenerationError> {
        Ok(StoredKey::new(&PrivateKey::generate(), HashAlgorithm::Sha3_256, None))
    }
}

/// Fresh key plus a ledger account created and paid for by the service account.
pub struct LedgerAccountKeyGenerator {
    engine: Arc<TransactionEngine>,
    service_account: SigningAccount,
}

impl LedgerAccountKeyGenerator {
    pub fn new(engine: Arc<TransactionEngine>, service_account: SigningAccount) -> Self {
        Self {
            engine,
            service_account,
        }
    }
}

#[async_trait]
impl KeyGenerator for LedgerAccountKeyGenerator {
    async fn generate(&self) -> Result<StoredKey, KeyGenerationError> {
        let key = PrivateKey::generate();
        let hash_algorithm = HashAlgorithm::Sha3_256;
        let payer = &self.service_account;

        let request = TransactionRequest::single_signer(
            CREATE_ACCOUNT_SCRIPT,
            payer.address,
            payer.key_index,
        )
        .gas_limit(CREATE_ACCOUNT_GAS_LIMIT)
        .argument(Argument::string(key.public_key_hex()))
        .argument(Argument::UInt8(key.algorithm().code()))
        .argument(Argument::UInt8(hash_algorithm.code()))
        .argument(Argument::UFix64(UFix64::parse(FULL_KEY_WEIGHT)?));

        let outcome = self.engine.execute(request, payer).await?;
        if let Some(message) = outcome.error_message {
            return Err(KeyGenerationError::Execution(message));
        }

        let address = outcome
            .events
            .iter()
            .filter(|e| e.event_type == "flow.AccountCreated")
            .find_map(|e| e.field("address"))
            .and_then(|v| v.get("value"))
            .and_then(|v| v.as_str())
            .and_then(|raw| Address::from_hex(raw).ok())
            .ok_or(KeyGenerationError::MissingAccountCreatedEvent)?;

        info!(%address, tx_id = %outcome.transaction_id, "Created ledger account");
        Ok(StoredKey::new(&key, hash_algorithm, Some(address)))
    }
}
