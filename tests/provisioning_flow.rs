// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flows across the gate, provisioning, vault and transaction engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{deposit_event, engine, gate, now, ScriptedLedger};
use relational_custody::assets::{AssetService, MintRequest};
use relational_custody::ledger::{Address, Argument, TransactionStatus, FLOW_TESTNET};
use relational_custody::provisioning::{
    KeyGenerationError, KeyGenerator, KeyProvisioner, ProvisionError, RandomKeyGenerator,
    StoredKey,
};
use relational_custody::transaction::{
    sign_envelope, Confirmer, HashAlgorithm, PrivateKey, SignedTransaction, TransactionError,
    TransactionRequest, TxBuilder,
};
use relational_custody::vault::{FsVault, InMemoryVault, SecretVault};
use tokio_util::sync::CancellationToken;

const USER: &str = "1001";

/// Generates keys bound to a fixed, pre-existing ledger account.
struct FixedAccountGenerator(Address);

#[async_trait]
impl KeyGenerator for FixedAccountGenerator {
    async fn generate(&self) -> Result<StoredKey, KeyGenerationError> {
        Ok(StoredKey::new(
            &PrivateKey::generate(),
            HashAlgorithm::Sha3_256,
            Some(self.0),
        ))
    }
}

fn current_code(gate: &relational_custody::otp::SecondFactorGate, user: &str) -> String {
    gate.current_code(user, now()).expect("user is enrolled")
}

#[tokio::test]
async fn fresh_user_provisions_and_mints() {
    let account = Address::from_hex("0x01cf0e2f2f715450").unwrap();
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.add_account(account, 0, 12);
    ledger.push_result(TransactionStatus::Sealed, None, vec![deposit_event()]);

    let gate = gate();
    let vault = Arc::new(InMemoryVault::new());
    let provisioner = KeyProvisioner::new(
        vault.clone(),
        gate.clone(),
        Arc::new(FixedAccountGenerator(account)),
    );

    let enrollment = gate.issue_secret(USER, "ana@example.com").unwrap();
    assert!(enrollment.provisioning_uri.contains("algorithm=SHA1"));

    let code = current_code(&gate, USER);
    let key = provisioner.provision_key(USER, &code).await.unwrap();
    assert_eq!(key.secret_id, "1001-privatekey");
    assert_eq!(key.address, Some(account));

    let signer = provisioner.signing_account(USER, &code).await.unwrap();
    let assets = AssetService::new(engine(ledger.clone()), ledger.clone(), FLOW_TESTNET.contracts);
    let outcome = assets
        .mint_nft(
            &signer,
            MintRequest {
                recipient: Address::from_hex("0xAAAA").unwrap(),
                name: "X".into(),
                description: "Y".into(),
                url: "https://e/x".into(),
                role: true,
            },
        )
        .await
        .unwrap();

    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(outcome.transaction_id, sent[0].id());
    assert_eq!(outcome.status, TransactionStatus::Sealed);
    assert_eq!(outcome.events.len(), 1);
    assert!(outcome.is_success());

    let tx = sent[0].transaction();
    assert_eq!(tx.proposal_key.sequence_number, 12);
    assert_eq!(tx.payer, account);
    assert_eq!(
        Argument::decode(&tx.arguments[4]).unwrap(),
        Argument::Bool(true)
    );
    assert_eq!(sent[0].envelope_signatures().len(), 1);
}

#[tokio::test]
async fn concurrent_provisioning_creates_one_secret() {
    let gate = gate();
    let vault = Arc::new(InMemoryVault::new());
    let provisioner = Arc::new(KeyProvisioner::new(
        vault.clone(),
        gate.clone(),
        Arc::new(RandomKeyGenerator),
    ));
    gate.issue_secret(USER, "ana").unwrap();
    let code = current_code(&gate, USER);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let provisioner = provisioner.clone();
            let code = code.clone();
            tokio::spawn(async move { provisioner.provision_key(USER, &code).await })
        })
        .collect();

    let mut refs = Vec::new();
    for task in tasks {
        refs.push(task.await.unwrap().unwrap());
    }

    assert!(refs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(vault.container_count(), 1);
    assert_eq!(vault.create_calls(), 1);
    assert_eq!(vault.version_count("1001-privatekey"), Some(1));
}

#[tokio::test]
async fn invalid_code_never_touches_the_vault() {
    let gate = gate();
    let vault = Arc::new(InMemoryVault::new());
    let provisioner = KeyProvisioner::new(vault.clone(), gate.clone(), Arc::new(RandomKeyGenerator));

    assert!(matches!(
        provisioner.provision_key(USER, "123456").await,
        Err(ProvisionError::InvalidCode)
    ));

    gate.issue_secret(USER, "ana").unwrap();
    assert!(matches!(
        provisioner.provision_key(USER, "not-a-code").await,
        Err(ProvisionError::InvalidCode)
    ));
    assert_eq!(vault.operations(), 0);
}

#[tokio::test]
async fn failed_append_is_resumed_on_retry() {
    let gate = gate();
    let vault = Arc::new(InMemoryVault::new());
    let provisioner = KeyProvisioner::new(vault.clone(), gate.clone(), Arc::new(RandomKeyGenerator));
    gate.issue_secret(USER, "ana").unwrap();
    let code = current_code(&gate, USER);

    vault.fail_next_append();
    assert!(matches!(
        provisioner.provision_key(USER, &code).await,
        Err(ProvisionError::VaultAppend(_))
    ));
    assert_eq!(vault.version_count("1001-privatekey"), Some(0));

    let key = provisioner.provision_key(USER, &code).await.unwrap();
    assert_eq!(key.version, 1);
    assert_eq!(vault.create_calls(), 1);
}

#[tokio::test]
async fn file_vault_keeps_keys_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let gate = gate();
    gate.issue_secret(USER, "ana").unwrap();
    let code = current_code(&gate, USER);

    let first = {
        let vault: Arc<dyn SecretVault> = Arc::new(FsVault::open(dir.path()).unwrap());
        KeyProvisioner::new(vault, gate.clone(), Arc::new(RandomKeyGenerator))
            .provision_key(USER, &code)
            .await
            .unwrap()
    };

    let vault: Arc<dyn SecretVault> = Arc::new(FsVault::open(dir.path()).unwrap());
    let provisioner = KeyProvisioner::new(vault, gate.clone(), Arc::new(RandomKeyGenerator));
    let second = provisioner.provision_key(USER, &code).await.unwrap();
    assert_eq!(first, second);

    let stored = provisioner.signing_key(USER, &code).await.unwrap();
    assert_eq!(stored.public_key, first.public_key);
}

async fn submit_one(ledger: &Arc<ScriptedLedger>, confirmer: &Confirmer) -> SignedTransaction {
    let address = Address::from_hex("0x01").unwrap();
    ledger.add_account(address, 0, 0);
    let key = PrivateKey::generate();
    let signer = relational_custody::transaction::AccountSigner::new(key, HashAlgorithm::Sha3_256);

    let tx = TxBuilder::new(ledger.clone())
        .build(TransactionRequest::single_signer("transaction {}", address, 0))
        .await
        .unwrap();
    let signed = sign_envelope(SignedTransaction::new(tx), &signer, address, 0).unwrap();
    confirmer.submit(&signed).await.unwrap();
    signed
}

#[tokio::test]
async fn await_seal_polls_once_per_scripted_status() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.script(&[
        TransactionStatus::Pending,
        TransactionStatus::Pending,
        TransactionStatus::Executed,
        TransactionStatus::Sealed,
    ]);
    let confirmer = Confirmer::new(ledger.clone()).with_poll_interval(Duration::from_millis(5));
    let signed = submit_one(&ledger, &confirmer).await;

    let outcome = confirmer
        .await_seal(signed.id(), Duration::from_secs(5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, TransactionStatus::Sealed);
    assert_eq!(ledger.polls(), 4);
}

#[tokio::test]
async fn await_seal_times_out_rather_than_expiring() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.script(&[TransactionStatus::Pending, TransactionStatus::Executed]);
    let confirmer = Confirmer::new(ledger.clone()).with_poll_interval(Duration::from_millis(5));
    let signed = submit_one(&ledger, &confirmer).await;

    let result = confirmer
        .await_seal(signed.id(), Duration::from_millis(60), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(TransactionError::Timeout { id }) if id == signed.id()));
    assert!(ledger.polls() >= 2);
}

#[tokio::test]
async fn await_seal_honours_cancellation() {
    let ledger = Arc::new(ScriptedLedger::new());
    let confirmer = Confirmer::new(ledger.clone()).with_poll_interval(Duration::from_millis(5));
    let signed = submit_one(&ledger, &confirmer).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = confirmer
        .await_seal(signed.id(), Duration::from_secs(5), &cancel)
        .await;
    assert!(matches!(result, Err(TransactionError::Cancelled { .. })));
}
