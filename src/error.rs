// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::assets::AssetError;
use crate::otp::OtpError;
use crate::provisioning::ProvisionError;
use crate::transaction::TransactionError;

/// Failures of custody operations, as seen by API callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid second-factor code")]
    InvalidCode,

    #[error("Second factor is already enrolled")]
    AlreadyEnrolled,

    #[error("User id cannot name a vault secret: {0}")]
    InvalidUserId(String),

    #[error("Vault error: {0}")]
    Vault(String),

    #[error("Vault secret creation failed: {0}")]
    VaultCreate(String),

    #[error("Vault append failed: {0}")]
    VaultAppend(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Stored key is unreadable: {0}")]
    CorruptKey(String),

    #[error("No key has been provisioned for this user")]
    KeyNotProvisioned,

    #[error("The provisioned key has no ledger account")]
    NoLedgerAccount,

    #[error("Ledger lookup failed: {0}")]
    RemoteLookup(String),

    #[error("Invalid argument: {0}")]
    ArgumentEncoding(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    Expired(String),

    #[error("Transaction {transaction_id} failed: {message}")]
    ExecutionFailed {
        transaction_id: String,
        message: String,
    },
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidCode => StatusCode::UNAUTHORIZED,
            ServiceError::Vault(_)
            | ServiceError::VaultCreate(_)
            | ServiceError::VaultAppend(_)
            | ServiceError::KeyGeneration(_)
            | ServiceError::CorruptKey(_)
            | ServiceError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::AlreadyEnrolled
            | ServiceError::KeyNotProvisioned
            | ServiceError::NoLedgerAccount
            | ServiceError::Expired(_) => StatusCode::CONFLICT,
            ServiceError::RemoteLookup(_) | ServiceError::Cancelled(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::ArgumentEncoding(_) | ServiceError::InvalidUserId(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::ExecutionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<ProvisionError> for ServiceError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::InvalidCode => ServiceError::InvalidCode,
            ProvisionError::InvalidUserId(e) => ServiceError::InvalidUserId(e.to_string()),
            ProvisionError::Vault(e) => ServiceError::Vault(e.to_string()),
            ProvisionError::VaultCreate(e) => ServiceError::VaultCreate(e.to_string()),
            ProvisionError::VaultAppend(e) => ServiceError::VaultAppend(e.to_string()),
            ProvisionError::KeyGeneration(e) => ServiceError::KeyGeneration(e.to_string()),
            ProvisionError::CorruptKey(m) => ServiceError::CorruptKey(m),
            ProvisionError::KeyNotProvisioned => ServiceError::KeyNotProvisioned,
            ProvisionError::NoLedgerAccount => ServiceError::NoLedgerAccount,
        }
    }
}

impl From<OtpError> for ServiceError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::AlreadyEnrolled => ServiceError::AlreadyEnrolled,
            OtpError::InvalidCode => ServiceError::InvalidCode,
        }
    }
}

impl From<TransactionError> for ServiceError {
    fn from(err: TransactionError) -> Self {
        let message = err.to_string();
        match err {
            TransactionError::RemoteLookup(_) => ServiceError::RemoteLookup(message),
            TransactionError::ArgumentEncoding(_) => ServiceError::ArgumentEncoding(message),
            TransactionError::Signing(_) => ServiceError::Signing(message),
            TransactionError::Timeout { .. } => ServiceError::Timeout(message),
            TransactionError::Cancelled { .. } => ServiceError::Cancelled(message),
            TransactionError::Expired { .. } => ServiceError::Expired(message),
        }
    }
}

impl From<AssetError> for ServiceError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Transaction(e) => e.into(),
            AssetError::Script(e) => ServiceError::RemoteLookup(e.to_string()),
            AssetError::Argument(e) => ServiceError::ArgumentEncoding(e.to_string()),
            AssetError::ExecutionFailed {
                transaction_id,
                message,
            } => ServiceError::ExecutionFailed {
                transaction_id,
                message,
            },
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %err, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %err, "Request rejected");
        }
        Self::new(status, err.to_string())
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        ServiceError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
