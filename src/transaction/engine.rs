// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Build, sign, submit and confirm in one call.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    sign_envelope, AccountSigner, Confirmer, KeySequencer, SignedTransaction, TransactionError,
    TransactionOutcome, TransactionRequest, TxBuilder,
};
use crate::ledger::{Address, LedgerClient};

/// Default time to wait for a submitted transaction to seal.
pub const DEFAULT_SEAL_TIMEOUT: Duration = Duration::from_secs(60);

/// An account key able to propose, pay for and authorize transactions.
#[derive(Debug, Clone)]
pub struct SigningAccount {
    pub address: Address,
    pub key_index: u32,
    pub signer: AccountSigner,
}

/// Facade over builder, signer and confirmer.
pub struct TransactionEngine {
    builder: TxBuilder,
    confirmer: Confirmer,
    sequencer: Arc<KeySequencer>,
    seal_timeout: Duration,
    shutdown: CancellationToken,
}

impl TransactionEngine {
    pub fn new(ledger: Arc<dyn LedgerClient>, shutdown: CancellationToken) -> Self {
        Self {
            builder: TxBuilder::new(ledger.clone()),
            confirmer: Confirmer::new(ledger),
            sequencer: Arc::new(KeySequencer::new()),
            seal_timeout: DEFAULT_SEAL_TIMEOUT,
            shutdown,
        }
    }

    pub fn with_seal_timeout(mut self, seal_timeout: Duration) -> Self {
        self.seal_timeout = seal_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.confirmer = self.confirmer.with_poll_interval(poll_interval);
        self
    }

    /// Submit `request` signed by `account` and wait for it to seal.
    ///
    /// The proposer key stays locked from build until submission so
    /// concurrent callers never reuse a sequence number.
    pub async fn execute(
        &self,
        request: TransactionRequest,
        account: &SigningAccount,
    ) -> Result<TransactionOutcome, TransactionError> {
        let guard = self
            .sequencer
            .lock(request.proposer, request.proposer_key_index)
            .await;

        let tx = self.builder.build(request).await?;
        let signed = sign_envelope(
            SignedTransaction::new(tx),
            &account.signer,
            account.address,
            account.key_index,
        )?;
        let id = self.confirmer.submit(&signed).await?;
        drop(guard);

        info!(
            tx_id = %id,
            signer = %account.address,
            timeout_secs = self.seal_timeout.as_secs(),
            "Awaiting seal"
        );
        self.confirmer
            .await_seal(id, self.seal_timeout, &self.shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::ScriptedLedger;
    use crate::ledger::{Argument, TransactionStatus};
    use crate::transaction::{HashAlgorithm, PrivateKey};

    fn account() -> SigningAccount {
        SigningAccount {
            address: Address::from_hex("0x01cf0e2f2f715450").unwrap(),
            key_index: 0,
            signer: AccountSigner::new(PrivateKey::generate(), HashAlgorithm::Sha3_256),
        }
    }

    fn engine(ledger: Arc<ScriptedLedger>) -> TransactionEngine {
        TransactionEngine::new(ledger, CancellationToken::new())
            .with_poll_interval(Duration::from_millis(5))
            .with_seal_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn executes_and_returns_sealed_outcome() {
        let signer = account();
        let ledger = Arc::new(ScriptedLedger::new().with_account(signer.address, 0, 7));
        ledger.push_status(TransactionStatus::Pending);
        ledger.push_status(TransactionStatus::Sealed);

        let request = TransactionRequest::single_signer("transaction {}", signer.address, 0)
            .argument(Argument::Bool(true));
        let outcome = engine(ledger.clone()).execute(request, &signer).await.unwrap();

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id(), outcome.transaction_id);
        assert_eq!(sent[0].transaction().proposal_key.sequence_number, 7);
        assert_eq!(sent[0].envelope_signatures().len(), 1);
        assert_eq!(outcome.status, TransactionStatus::Sealed);
    }

    #[tokio::test]
    async fn concurrent_submissions_use_distinct_sequence_numbers() {
        let signer = account();
        let ledger = Arc::new(ScriptedLedger::new().with_account(signer.address, 0, 0));
        ledger.push_status(TransactionStatus::Sealed);
        let engine = Arc::new(engine(ledger.clone()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let signer = signer.clone();
                tokio::spawn(async move {
                    let request =
                        TransactionRequest::single_signer("transaction {}", signer.address, 0);
                    engine.execute(request, &signer).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut sequences: Vec<u64> = ledger
            .sent()
            .iter()
            .map(|tx| tx.transaction().proposal_key.sequence_number)
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn signing_failure_submits_nothing() {
        let signer = account();
        let stranger = Address::from_hex("0x02").unwrap();
        let ledger = Arc::new(ScriptedLedger::new().with_account(stranger, 0, 0));

        let request = TransactionRequest::single_signer("transaction {}", stranger, 0);
        let err = engine(ledger.clone())
            .execute(request, &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, TransactionError::Signing(_)));
        assert!(ledger.sent().is_empty());
    }
}
