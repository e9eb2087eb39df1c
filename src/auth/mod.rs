// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the custody API.
//!
//! ## Auth Flow
//!
//! 1. The user signs in with the upstream identity service, which issues an
//!    HS256 JWT carrying a `user_id` claim
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. This server:
//!    - Verifies the signature with the shared `JWT_SECRET`
//!    - Verifies expiry (60 s leeway)
//!    - Extracts `user_id` (number or string) as the canonical user id
//!
//! Token issuance is out of scope.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod verifier;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use verifier::JwtVerifier;
