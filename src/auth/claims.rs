// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `user_id` as issued upstream: numeric database ids and opaque strings are
/// both accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum UserIdClaim {
    Number(u64),
    Text(String),
}

impl UserIdClaim {
    pub(crate) fn into_string(self) -> String {
        match self {
            UserIdClaim::Number(n) => n.to_string(),
            UserIdClaim::Text(s) => s,
        }
    }
}

/// Claims read from an access token.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessClaims {
    pub user_id: UserIdClaim,

    /// Expiration timestamp (validated by jsonwebtoken)
    pub exp: i64,

    /// Optional display label, used as the authenticator account name
    #[serde(default)]
    pub email: Option<String>,
}

/// Authenticated user information extracted from JWT.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID
    pub user_id: String,

    /// Label shown in authenticator apps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub(crate) fn from_claims(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.user_id.into_string(),
            email: claims.email,
            expires_at: claims.exp,
        }
    }

    /// Account label for TOTP enrollment.
    pub fn account_label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_user_id_is_stringified() {
        let claims: AccessClaims =
            serde_json::from_str(r#"{"user_id": 42, "exp": 1700003600}"#).unwrap();
        let user = AuthenticatedUser::from_claims(claims);
        assert_eq!(user.user_id, "42");
        assert_eq!(user.account_label(), "42");
    }

    #[test]
    fn string_user_id_and_email() {
        let claims: AccessClaims = serde_json::from_str(
            r#"{"user_id": "u-7", "exp": 1700003600, "email": "ana@example.com"}"#,
        )
        .unwrap();
        let user = AuthenticatedUser::from_claims(claims);
        assert_eq!(user.user_id, "u-7");
        assert_eq!(user.account_label(), "ana@example.com");
    }

    #[test]
    fn missing_user_id_is_rejected() {
        assert!(serde_json::from_str::<AccessClaims>(r#"{"exp": 1}"#).is_err());
    }
}
