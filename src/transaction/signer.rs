// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope signing.
//!
//! Signatures are deterministic (RFC 6979) ECDSA over the hash of the
//! domain-tagged envelope message, serialized as 64 raw `r || s` bytes.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use super::{rlp, SignedTransaction, TransactionSignature};
use crate::ledger::Address;

/// Errors raised while signing a transaction.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Unsupported algorithm pair {signature}/{hash}")]
    UnsupportedAlgorithm {
        signature: SignatureAlgorithm,
        hash: HashAlgorithm,
    },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("{0} is not a proposer, payer or authorizer of this transaction")]
    NotASigner(Address),

    #[error("Signature failed: {0}")]
    Signature(String),
}

/// Curve of an account key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "ECDSA_P256")]
    EcdsaP256,
    #[serde(rename = "ECDSA_secp256k1")]
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    /// Numeric code used by account-creation scripts.
    pub fn code(self) -> u8 {
        match self {
            Self::EcdsaP256 => 1,
            Self::EcdsaSecp256k1 => 2,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EcdsaP256 => "ECDSA_P256",
            Self::EcdsaSecp256k1 => "ECDSA_secp256k1",
        })
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ECDSA_P256" | "P256" => Ok(Self::EcdsaP256),
            "ECDSA_SECP256K1" | "SECP256K1" => Ok(Self::EcdsaSecp256k1),
            other => Err(format!("unknown signature algorithm: {other}")),
        }
    }
}

/// Hash applied to the signing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA2_256")]
    Sha2_256,
    #[serde(rename = "SHA3_256")]
    Sha3_256,
}

impl HashAlgorithm {
    pub fn code(self) -> u8 {
        match self {
            Self::Sha2_256 => 1,
            Self::Sha3_256 => 3,
        }
    }

    pub fn digest(self, message: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha2_256 => Sha256::digest(message).into(),
            Self::Sha3_256 => Sha3_256::digest(message).into(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha2_256 => "SHA2_256",
            Self::Sha3_256 => "SHA3_256",
        })
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SHA2_256" | "SHA256" => Ok(Self::Sha2_256),
            "SHA3_256" => Ok(Self::Sha3_256),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

/// An account private key on one of the supported curves.
#[derive(Clone)]
pub enum PrivateKey {
    Secp256k1(k256::ecdsa::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Fresh secp256k1 key from OS randomness.
    pub fn generate() -> Self {
        Self::generate_for(SignatureAlgorithm::EcdsaSecp256k1)
    }

    pub fn generate_for(algorithm: SignatureAlgorithm) -> Self {
        match algorithm {
            SignatureAlgorithm::EcdsaSecp256k1 => {
                Self::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
            }
            SignatureAlgorithm::EcdsaP256 => Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
        }
    }

    /// Parse a hex secp256k1 scalar, with or without `0x`.
    pub fn from_hex(raw: &str) -> Result<Self, SigningError> {
        Self::from_hex_for(SignatureAlgorithm::EcdsaSecp256k1, raw)
    }

    pub fn from_hex_for(algorithm: SignatureAlgorithm, raw: &str) -> Result<Self, SigningError> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        match algorithm {
            SignatureAlgorithm::EcdsaSecp256k1 => k256::ecdsa::SigningKey::from_slice(&bytes)
                .map(Self::Secp256k1)
                .map_err(|e| SigningError::InvalidKey(e.to_string())),
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(&bytes)
                .map(Self::P256)
                .map_err(|e| SigningError::InvalidKey(e.to_string())),
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
            Self::P256(_) => SignatureAlgorithm::EcdsaP256,
        }
    }

    pub fn to_hex(&self) -> String {
        match self {
            Self::Secp256k1(key) => hex::encode(key.to_bytes()),
            Self::P256(key) => hex::encode(key.to_bytes()),
        }
    }

    /// Uncompressed public key without the SEC1 `0x04` prefix (128 hex chars).
    pub fn public_key_hex(&self) -> String {
        let sec1 = match self {
            Self::Secp256k1(key) => k256::PublicKey::from(key.verifying_key())
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Self::P256(key) => p256::PublicKey::from(key.verifying_key())
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        };
        hex::encode(&sec1[1..])
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SigningError> {
        match self {
            Self::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| SigningError::Signature(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
            Self::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| SigningError::Signature(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Private key together with the algorithms declared on its account key.
#[derive(Debug, Clone)]
pub struct AccountSigner {
    pub key: PrivateKey,
    pub signature_algorithm: SignatureAlgorithm,
    pub hash_algorithm: HashAlgorithm,
}

impl AccountSigner {
    /// Signer declaring the key's own curve.
    pub fn new(key: PrivateKey, hash_algorithm: HashAlgorithm) -> Self {
        Self {
            signature_algorithm: key.algorithm(),
            key,
            hash_algorithm,
        }
    }

    /// Sign an arbitrary message with the declared hash.
    ///
    /// The declared signature algorithm must match the key's curve.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        if self.key.algorithm() != self.signature_algorithm {
            return Err(SigningError::UnsupportedAlgorithm {
                signature: self.signature_algorithm,
                hash: self.hash_algorithm,
            });
        }
        self.key.sign_digest(&self.hash_algorithm.digest(message))
    }
}

/// Produce an envelope signature for `address`/`key_index` and attach it.
///
/// The envelope covers the payload and any payload signatures already present,
/// so payload signers must sign first.
pub fn sign_envelope(
    mut signed: SignedTransaction,
    signer: &AccountSigner,
    address: Address,
    key_index: u32,
) -> Result<SignedTransaction, SigningError> {
    let signer_index = signed
        .transaction()
        .signer_index(address)
        .ok_or(SigningError::NotASigner(address))?;

    let message = rlp::envelope_message(&signed);
    let signature = signer.sign(&message)?;

    signed.push_envelope_signature(TransactionSignature {
        address,
        signer_index,
        key_index,
        signature,
    });
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    use super::*;
    use crate::ledger::Identifier;
    use crate::transaction::{ProposalKey, Transaction};

    const KEY_HEX: &str = "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";

    fn account() -> Address {
        Address::from_hex("0x01cf0e2f2f715450").unwrap()
    }

    fn unsigned() -> SignedTransaction {
        SignedTransaction::new(Transaction {
            script: b"transaction { execute {} }".to_vec(),
            arguments: vec![],
            reference_block_id: Identifier::new([7; 32]),
            gas_limit: 100,
            proposal_key: ProposalKey {
                address: account(),
                key_index: 0,
                sequence_number: 3,
            },
            payer: account(),
            authorizers: vec![account()],
        })
    }

    fn verify(signer: &AccountSigner, signed: &SignedTransaction) {
        let mut unsigned = signed.clone();
        unsigned.envelope_signatures.clear();
        let digest = signer
            .hash_algorithm
            .digest(&rlp::envelope_message(&unsigned));

        let mut sec1 = vec![0x04];
        sec1.extend(hex::decode(signer.key.public_key_hex()).unwrap());
        let raw = &signed.envelope_signatures()[0].signature;
        match signer.key {
            PrivateKey::Secp256k1(_) => {
                let verifying = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).unwrap();
                let signature = k256::ecdsa::Signature::from_slice(raw).unwrap();
                verifying.verify_prehash(&digest, &signature).unwrap();
            }
            PrivateKey::P256(_) => {
                let verifying = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).unwrap();
                let signature = p256::ecdsa::Signature::from_slice(raw).unwrap();
                verifying.verify_prehash(&digest, &signature).unwrap();
            }
        }
    }

    #[test]
    fn signs_with_sha3_and_verifies() {
        let signer =
            AccountSigner::new(PrivateKey::from_hex(KEY_HEX).unwrap(), HashAlgorithm::Sha3_256);
        assert_eq!(signer.signature_algorithm, SignatureAlgorithm::EcdsaSecp256k1);
        let signed = sign_envelope(unsigned(), &signer, account(), 0).unwrap();

        let sig = &signed.envelope_signatures()[0];
        assert_eq!(sig.signature.len(), 64);
        assert_eq!(sig.signer_index, 0);
        verify(&signer, &signed);
    }

    #[test]
    fn signs_with_sha2_and_verifies() {
        let signer =
            AccountSigner::new(PrivateKey::from_hex(KEY_HEX).unwrap(), HashAlgorithm::Sha2_256);
        let signed = sign_envelope(unsigned(), &signer, account(), 0).unwrap();
        verify(&signer, &signed);
    }

    #[test]
    fn p256_keys_sign_and_verify() {
        let key = PrivateKey::from_hex_for(SignatureAlgorithm::EcdsaP256, KEY_HEX).unwrap();
        assert_eq!(key.algorithm(), SignatureAlgorithm::EcdsaP256);
        assert_eq!(key.to_hex(), KEY_HEX);
        assert_eq!(key.public_key_hex().len(), 128);
        assert_ne!(
            key.public_key_hex(),
            PrivateKey::from_hex(KEY_HEX).unwrap().public_key_hex()
        );

        for hash in [HashAlgorithm::Sha3_256, HashAlgorithm::Sha2_256] {
            let signer = AccountSigner::new(key.clone(), hash);
            assert_eq!(signer.signature_algorithm, SignatureAlgorithm::EcdsaP256);
            let signed = sign_envelope(unsigned(), &signer, account(), 0).unwrap();
            assert_eq!(signed.envelope_signatures()[0].signature.len(), 64);
            verify(&signer, &signed);
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let signer =
            AccountSigner::new(PrivateKey::from_hex(KEY_HEX).unwrap(), HashAlgorithm::Sha3_256);
        let a = sign_envelope(unsigned(), &signer, account(), 0).unwrap();
        let b = sign_envelope(unsigned(), &signer, account(), 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn declared_curve_must_match_key() {
        let signer = AccountSigner {
            key: PrivateKey::from_hex(KEY_HEX).unwrap(),
            signature_algorithm: SignatureAlgorithm::EcdsaP256,
            hash_algorithm: HashAlgorithm::Sha3_256,
        };
        assert!(matches!(
            sign_envelope(unsigned(), &signer, account(), 0),
            Err(SigningError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn rejects_non_signer_and_bad_keys() {
        let signer = AccountSigner::new(PrivateKey::generate(), HashAlgorithm::Sha3_256);
        let stranger = Address::from_hex("0x02").unwrap();
        assert!(matches!(
            sign_envelope(unsigned(), &signer, stranger, 0),
            Err(SigningError::NotASigner(a)) if a == stranger
        ));

        assert!(matches!(
            PrivateKey::from_hex("not-hex"),
            Err(SigningError::InvalidKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_hex(&"00".repeat(32)),
            Err(SigningError::InvalidKey(_))
        ));
        assert!(matches!(
            PrivateKey::from_hex_for(SignatureAlgorithm::EcdsaP256, &"ff".repeat(32)),
            Err(SigningError::InvalidKey(_))
        ));
    }

    #[test]
    fn key_hex_round_trips_and_debug_is_redacted() {
        let key = PrivateKey::from_hex(KEY_HEX).unwrap();
        assert_eq!(key.to_hex(), KEY_HEX);
        assert_eq!(key.public_key_hex().len(), 128);
        assert!(!format!("{key:?}").contains(KEY_HEX));
    }

    #[test]
    fn algorithms_parse_config_values() {
        assert_eq!("sha3_256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha3_256));
        assert_eq!("SHA2-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha2_256));
        assert!("md5".parse::<HashAlgorithm>().is_err());

        assert_eq!(
            "ECDSA_P256".parse::<SignatureAlgorithm>(),
            Ok(SignatureAlgorithm::EcdsaP256)
        );
        assert_eq!(
            "secp256k1".parse::<SignatureAlgorithm>(),
            Ok(SignatureAlgorithm::EcdsaSecp256k1)
        );
        assert!("ed25519".parse::<SignatureAlgorithm>().is_err());
    }
}
