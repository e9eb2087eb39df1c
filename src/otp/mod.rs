// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Second-factor gate.
//!
//! Users enroll once and receive an `otpauth://` provisioning URI for their
//! authenticator app. Sensitive operations then require a current code.
//! Validation is a pure function of (secret, time, code).

use std::sync::Arc;

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use tracing::{info, warn};

pub mod store;
pub mod totp;

pub use store::{InMemorySecretStore, SecretStore};
pub use totp::Totp;

/// Issuer shown in authenticator apps.
pub const DEFAULT_ISSUER: &str = "Prague";

/// Seconds per code.
pub const DEFAULT_PERIOD_SECS: u64 = 90;

/// Accepted drift in steps either side of the current one.
pub const DEFAULT_SKEW_STEPS: u64 = 1;

/// Shared secret length in bytes.
pub const SECRET_LEN: usize = 20;

/// Result of enrolling a user.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Enrollment {
    /// `otpauth://totp/...` URI, usually rendered as a QR code.
    pub provisioning_uri: String,
    /// Base32 secret for manual entry.
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("Second factor is already enrolled")]
    AlreadyEnrolled,

    #[error("Invalid second-factor code")]
    InvalidCode,
}

pub struct SecondFactorGate {
    store: Arc<dyn SecretStore>,
    issuer: String,
    period: u64,
    skew: u64,
}

impl SecondFactorGate {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            issuer: DEFAULT_ISSUER.to_string(),
            period: DEFAULT_PERIOD_SECS,
            skew: DEFAULT_SKEW_STEPS,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_period(mut self, period_secs: u64) -> Self {
        self.period = period_secs.max(1);
        self
    }

    /// Generate the first secret for `user_id`.
    ///
    /// Fails with [`OtpError::AlreadyEnrolled`] if the user has one; use
    /// [`rotate_secret`](Self::rotate_secret) to replace it.
    pub fn issue_secret(&self, user_id: &str, account_label: &str) -> Result<Enrollment, OtpError> {
        let (secret, encoded) = fresh_secret();
        if !self.store.insert_new(user_id, secret) {
            warn!(user_id, "Refused to re-issue second-factor secret");
            return Err(OtpError::AlreadyEnrolled);
        }
        info!(user_id, "Issued second-factor secret");
        Ok(self.enrollment(account_label, encoded))
    }

    /// Replace the secret of an enrolled user who proves possession of the
    /// current one.
    pub fn rotate_secret(
        &self,
        user_id: &str,
        account_label: &str,
        code: &str,
    ) -> Result<Enrollment, OtpError> {
        if !self.validate_code(user_id, code) {
            warn!(user_id, "Rejected second-factor code for rotation");
            return Err(OtpError::InvalidCode);
        }
        let (secret, encoded) = fresh_secret();
        self.store.put(user_id, secret);
        info!(user_id, "Rotated second-factor secret");
        Ok(self.enrollment(account_label, encoded))
    }

    fn enrollment(&self, account_label: &str, encoded: String) -> Enrollment {
        Enrollment {
            provisioning_uri: totp::provisioning_uri(&self.issuer, account_label, &encoded, self.period),
            secret: encoded,
        }
    }

    /// Check `code` against the current time. Unknown users never validate.
    pub fn validate_code(&self, user_id: &str, code: &str) -> bool {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        self.validate_code_at(user_id, code, now)
    }

    pub fn validate_code_at(&self, user_id: &str, code: &str, unix_secs: u64) -> bool {
        let Some(secret) = self.store.get(user_id) else {
            return false;
        };
        Totp::new(secret, self.period, self.skew).verify(code, unix_secs)
    }

    /// Current code for `user_id`, if enrolled.
    pub fn current_code(&self, user_id: &str, unix_secs: u64) -> Option<String> {
        self.store
            .get(user_id)
            .map(|secret| Totp::new(secret, self.period, self.skew).generate(unix_secs))
    }
}

fn fresh_secret() -> (Vec<u8>, String) {
    let mut secret = vec![0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    let encoded = totp::base32_encode(&secret);
    (secret, encoded)
}
