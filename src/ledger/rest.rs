// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flow Access Node REST client.
//!
//! Implements [`LedgerClient`] on top of the Access API HTTP endpoints:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `get_account` | `GET /v1/accounts/{address}?expand=keys` |
//! | `get_latest_block_header` | `GET /v1/blocks?height=sealed` |
//! | `execute_script` | `POST /v1/scripts?block_height=sealed` |
//! | `send_transaction` | `POST /v1/transactions` |
//! | `get_transaction_result` | `GET /v1/transaction_results/{id}` |
//!
//! Binary fields (scripts, arguments, signatures, event payloads) are base64
//! encoded and 64-bit integers are transported as decimal strings.

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use super::{
    cadence::render_text, Account, AccountKey, Address, BlockHeader, Event, Identifier,
    LedgerClient, LedgerError, NetworkConfig, ScriptOutput, TransactionId, TransactionResult,
    TransactionStatus,
};
use crate::transaction::{SignedTransaction, TransactionSignature};

/// Flow Access REST client.
pub struct FlowRestClient {
    network: NetworkConfig,
    base_url: Url,
    http: reqwest::Client,
}

impl FlowRestClient {
    /// Create a client for the network's default access node.
    pub fn new(network: NetworkConfig) -> Result<Self, LedgerError> {
        Self::with_access_url(network, network.access_url)
    }

    /// Create a client against an explicit access node URL.
    pub fn with_access_url(network: NetworkConfig, access_url: &str) -> Result<Self, LedgerError> {
        let base_url: Url = access_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("relational-custody/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            network,
            base_url,
            http,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::InvalidUrl(e.to_string()))
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| LedgerError::MalformedResponse(e.to_string()));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| status.to_string());

        if status == reqwest::StatusCode::NOT_FOUND {
            Err(LedgerError::NotFound(message))
        } else {
            Err(LedgerError::Rpc {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, LedgerError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Self::read_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, LedgerError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Self::read_response(response).await
    }
}

#[async_trait]
impl LedgerClient for FlowRestClient {
    async fn get_account(&self, address: Address) -> Result<Account, LedgerError> {
        let mut url = self.endpoint(&format!("/v1/accounts/{}", address.to_hex()))?;
        url.query_pairs_mut()
            .append_pair("block_height", "sealed")
            .append_pair("expand", "keys");

        let body: AccountBody = self.get_json(url).await?;
        body.into_account()
    }

    async fn get_latest_block_header(&self) -> Result<BlockHeader, LedgerError> {
        let mut url = self.endpoint("/v1/blocks")?;
        url.query_pairs_mut().append_pair("height", "sealed");

        let blocks: Vec<BlockBody> = self.get_json(url).await?;
        let header = blocks
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::MalformedResponse("no sealed block returned".into()))?
            .header;

        Ok(BlockHeader {
            id: parse_identifier(&header.id)?,
            height: parse_u64(&header.height, "height")?,
        })
    }

    async fn execute_script(
        &self,
        script: &[u8],
        arguments: &[Vec<u8>],
    ) -> Result<ScriptOutput, LedgerError> {
        let mut url = self.endpoint("/v1/scripts")?;
        url.query_pairs_mut().append_pair("block_height", "sealed");

        let body = ScriptBody {
            script: Base64::encode_string(script),
            arguments: arguments.iter().map(|a| Base64::encode_string(a)).collect(),
        };

        let encoded: String = self.post_json(url, &body).await?;
        let value = decode_cadence(&encoded)?;
        Ok(ScriptOutput(render_text(&value)))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TransactionId, LedgerError> {
        let url = self.endpoint("/v1/transactions")?;
        let body = TransactionBody::from(tx);

        let response: SendResponse = self.post_json(url, &body).await?;
        parse_identifier(&response.id)
    }

    async fn get_transaction_result(
        &self,
        id: &TransactionId,
    ) -> Result<TransactionResult, LedgerError> {
        let url = self.endpoint(&format!("/v1/transaction_results/{}", id.to_hex()))?;
        let body: ResultBody = self.get_json(url).await?;

        let events = body
            .events
            .into_iter()
            .map(EventBody::into_event)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransactionResult {
            status: TransactionStatus::parse(&body.status),
            error_message: body.error_message.filter(|m| !m.is_empty()),
            events,
        })
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct AccountBody {
    address: String,
    #[serde(default)]
    balance: String,
    #[serde(default)]
    keys: Vec<AccountKeyBody>,
}

#[derive(Deserialize)]
struct AccountKeyBody {
    index: String,
    public_key: String,
    sequence_number: String,
    weight: String,
    #[serde(default)]
    revoked: bool,
}

impl AccountBody {
    fn into_account(self) -> Result<Account, LedgerError> {
        let keys = self
            .keys
            .into_iter()
            .map(|k| {
                Ok(AccountKey {
                    index: parse_u32(&k.index, "key index")?,
                    public_key: k.public_key,
                    sequence_number: parse_u64(&k.sequence_number, "sequence_number")?,
                    weight: parse_u32(&k.weight, "weight")?,
                    revoked: k.revoked,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Account {
            address: Address::from_hex(&self.address)
                .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?,
            balance: if self.balance.is_empty() {
                0
            } else {
                parse_u64(&self.balance, "balance")?
            },
            keys,
        })
    }
}

#[derive(Deserialize)]
struct BlockBody {
    header: BlockHeaderBody,
}

#[derive(Deserialize)]
struct BlockHeaderBody {
    id: String,
    height: String,
}

#[derive(Serialize)]
struct ScriptBody {
    script: String,
    arguments: Vec<String>,
}

#[derive(Serialize)]
struct ProposalKeyBody {
    address: String,
    key_index: String,
    sequence_number: String,
}

#[derive(Serialize)]
struct SignatureBody {
    address: String,
    key_index: String,
    signature: String,
}

impl From<&TransactionSignature> for SignatureBody {
    fn from(sig: &TransactionSignature) -> Self {
        Self {
            address: sig.address.to_hex(),
            key_index: sig.key_index.to_string(),
            signature: Base64::encode_string(&sig.signature),
        }
    }
}

#[derive(Serialize)]
struct TransactionBody {
    script: String,
    arguments: Vec<String>,
    reference_block_id: String,
    gas_limit: String,
    payer: String,
    proposal_key: ProposalKeyBody,
    authorizers: Vec<String>,
    payload_signatures: Vec<SignatureBody>,
    envelope_signatures: Vec<SignatureBody>,
}

impl From<&SignedTransaction> for TransactionBody {
    fn from(signed: &SignedTransaction) -> Self {
        let tx = signed.transaction();
        Self {
            script: Base64::encode_string(&tx.script),
            arguments: tx.arguments.iter().map(|a| Base64::encode_string(a)).collect(),
            reference_block_id: tx.reference_block_id.to_hex(),
            gas_limit: tx.gas_limit.to_string(),
            payer: tx.payer.to_hex(),
            proposal_key: ProposalKeyBody {
                address: tx.proposal_key.address.to_hex(),
                key_index: tx.proposal_key.key_index.to_string(),
                sequence_number: tx.proposal_key.sequence_number.to_string(),
            },
            authorizers: tx.authorizers.iter().map(Address::to_hex).collect(),
            payload_signatures: signed.payload_signatures().iter().map(Into::into).collect(),
            envelope_signatures: signed.envelope_signatures().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Deserialize)]
struct ResultBody {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    events: Vec<EventBody>,
}

#[derive(Deserialize)]
struct EventBody {
    #[serde(rename = "type")]
    event_type: String,
    transaction_id: String,
    transaction_index: String,
    event_index: String,
    payload: String,
}

impl EventBody {
    fn into_event(self) -> Result<Event, LedgerError> {
        Ok(Event {
            transaction_id: parse_identifier(&self.transaction_id)?,
            transaction_index: parse_u32(&self.transaction_index, "transaction_index")?,
            event_index: parse_u32(&self.event_index, "event_index")?,
            payload: decode_cadence(&self.payload)?,
            event_type: self.event_type,
        })
    }
}

fn parse_u64(raw: &str, field: &str) -> Result<u64, LedgerError> {
    raw.parse()
        .map_err(|_| LedgerError::MalformedResponse(format!("{field} is not a number: {raw}")))
}

fn parse_u32(raw: &str, field: &str) -> Result<u32, LedgerError> {
    u32::try_from(parse_u64(raw, field)?)
        .map_err(|_| LedgerError::MalformedResponse(format!("{field} is out of range: {raw}")))
}

fn parse_identifier(raw: &str) -> Result<Identifier, LedgerError> {
    Identifier::from_hex(raw).map_err(|e| LedgerError::MalformedResponse(e.to_string()))
}

fn decode_cadence(encoded: &str) -> Result<serde_json::Value, LedgerError> {
    let bytes = Base64::decode_vec(encoded.trim())
        .map_err(|e| LedgerError::MalformedResponse(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| LedgerError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::FLOW_TESTNET;

    #[test]
    fn account_body_parses_string_numbers() {
        let body: AccountBody = serde_json::from_value(serde_json::json!({
            "address": "4ac0ee1c903bf362",
            "balance": "100000",
            "keys": [{
                "index": "0",
                "public_key": "0xabcd",
                "signing_algorithm": "ECDSA_secp256k1",
                "hashing_algorithm": "SHA3_256",
                "sequence_number": "42",
                "weight": "1000",
                "revoked": false
            }]
        }))
        .unwrap();

        let account = body.into_account().unwrap();
        assert_eq!(account.address.to_string(), "0x4ac0ee1c903bf362");
        assert_eq!(account.key(0).unwrap().sequence_number, 42);
        assert_eq!(account.key(0).unwrap().weight, 1000);
    }

    #[test]
    fn account_body_rejects_non_numeric_fields() {
        let body: AccountBody = serde_json::from_value(serde_json::json!({
            "address": "01",
            "keys": [{"index": "zero", "public_key": "", "sequence_number": "0", "weight": "1"}]
        }))
        .unwrap();
        assert!(matches!(
            body.into_account(),
            Err(LedgerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn account_body_rejects_out_of_range_key_fields() {
        let body: AccountBody = serde_json::from_value(serde_json::json!({
            "address": "01",
            "keys": [{"index": "4294967296", "public_key": "", "sequence_number": "0", "weight": "1000"}]
        }))
        .unwrap();
        assert!(matches!(
            body.into_account(),
            Err(LedgerError::MalformedResponse(m)) if m.contains("key index")
        ));

        let body: AccountBody = serde_json::from_value(serde_json::json!({
            "address": "01",
            "keys": [{"index": "0", "public_key": "", "sequence_number": "0", "weight": "4294968296"}]
        }))
        .unwrap();
        assert!(matches!(
            body.into_account(),
            Err(LedgerError::MalformedResponse(m)) if m.contains("weight")
        ));
    }

    #[test]
    fn event_payload_is_decoded_from_base64() {
        let payload = serde_json::json!({"type": "Event", "value": {"id": "flow.AccountCreated", "fields": []}});
        let body = EventBody {
            event_type: "flow.AccountCreated".into(),
            transaction_id: "00".repeat(32),
            transaction_index: "0".into(),
            event_index: "3".into(),
            payload: Base64::encode_string(payload.to_string().as_bytes()),
        };

        let event = body.into_event().unwrap();
        assert_eq!(event.event_index, 3);
        assert_eq!(event.payload, payload);
    }

    #[test]
    fn endpoint_joins_against_base() {
        let client = FlowRestClient::with_access_url(FLOW_TESTNET, "http://localhost:8888").unwrap();
        assert_eq!(
            client.endpoint("/v1/blocks").unwrap().as_str(),
            "http://localhost:8888/v1/blocks"
        );
        assert!(matches!(
            FlowRestClient::with_access_url(FLOW_TESTNET, "not a url"),
            Err(LedgerError::InvalidUrl(_))
        ));
    }
}
