// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confirmation Engine
//!
//! Submits signed transactions and polls the access node until a terminal
//! status is observed.
//!
//! ## Strategy
//!
//! 1. Poll immediately after submission.
//! 2. `sealed` returns the outcome (including any execution error) without
//!    another poll; `expired` fails with [`TransactionError::Expired`].
//! 3. Every other status sleeps `poll_interval` (default 1 s) and polls again.
//! 4. A failed poll is returned as-is; there is no internal retry.
//!
//! Timeout and cancellation only stop the local wait. The transaction may
//! still be sealed remotely afterwards.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{SignedTransaction, TransactionError, TransactionOutcome};
use crate::ledger::{LedgerClient, TransactionId, TransactionStatus};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Confirmer {
    ledger: Arc<dyn LedgerClient>,
    poll_interval: Duration,
}

impl Confirmer {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn submit(&self, signed: &SignedTransaction) -> Result<TransactionId, TransactionError> {
        let id = self.ledger.send_transaction(signed).await?;
        info!(tx_id = %id, "Transaction submitted");
        Ok(id)
    }

    /// Wait until `id` reaches a terminal status, `timeout` elapses or `cancel` fires.
    pub async fn await_seal(
        &self,
        id: TransactionId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TransactionOutcome, TransactionError> {
        let deadline = Instant::now() + timeout;
        let mut polls: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransactionError::Cancelled { id }),
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(tx_id = %id, polls, "Timed out waiting for seal");
                    return Err(TransactionError::Timeout { id });
                }
                result = self.ledger.get_transaction_result(&id) => result?,
            };
            polls += 1;

            match result.status {
                TransactionStatus::Sealed => {
                    info!(
                        tx_id = %id,
                        polls,
                        failed = result.error_message.is_some(),
                        events = result.events.len(),
                        "Transaction sealed"
                    );
                    return Ok(TransactionOutcome {
                        transaction_id: id,
                        status: result.status,
                        error_message: result.error_message,
                        events: result.events,
                    });
                }
                TransactionStatus::Expired => {
                    warn!(tx_id = %id, polls, "Transaction expired");
                    return Err(TransactionError::Expired { id });
                }
                status => debug!(tx_id = %id, %status, polls, "Transaction not sealed yet"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransactionError::Cancelled { id }),
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(tx_id = %id, polls, "Timed out waiting for seal");
                    return Err(TransactionError::Timeout { id });
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
