// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access token verification.

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::claims::AccessClaims;
use super::{AuthError, AuthenticatedUser};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies tokens signed with the shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<AccessClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            }
        })?;

        Ok(AuthenticatedUser::from_claims(data.claims))
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_tokens::{token_for, token_with, SECRET};
    use super::*;

    #[test]
    fn accepts_valid_token() {
        let user = JwtVerifier::new(SECRET).verify(&token_for(17)).unwrap();
        assert_eq!(user.user_id, "17");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = token_with(b"other", json!({"user_id": 1, "exp": 9_999_999_999i64}));
        assert_eq!(
            JwtVerifier::new(SECRET).verify(&token).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn rejects_expired_token() {
        let token = token_with(SECRET, json!({"user_id": 1, "exp": 1_000}));
        assert_eq!(
            JwtVerifier::new(SECRET).verify(&token).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            JwtVerifier::new(SECRET).verify("not.a.jwt").unwrap_err(),
            AuthError::MalformedToken
        );
    }
}
