// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Second-factor enrollment and rotation.

use axum::{
    extract::{Query, State},
    Json,
};

use super::CodeQuery;
use crate::{auth::Auth, error::ApiError, otp::Enrollment, state::AppState};

/// Issue the first TOTP secret for the authenticated user.
///
/// The response is shown once and should be rendered as a QR code by the
/// client. An enrolled user gets 409; replacing a secret goes through
/// `/api/otp/rotate`.
#[utoipa::path(
    post,
    path = "/api/otp/enroll",
    tag = "Second factor",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Secret issued", body = Enrollment),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn enroll(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Enrollment>, ApiError> {
    let enrollment = state.gate.issue_secret(&user.user_id, user.account_label())?;
    Ok(Json(enrollment))
}

/// Replace the user's TOTP secret. Requires a current code from the old one.
#[utoipa::path(
    post,
    path = "/api/otp/rotate",
    tag = "Second factor",
    security(("bearer_auth" = [])),
    params(CodeQuery),
    responses(
        (status = 200, description = "Secret replaced", body = Enrollment),
        (status = 401, description = "Unauthorized or invalid code")
    )
)]
pub async fn rotate(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<Enrollment>, ApiError> {
    let enrollment = state
        .gate
        .rotate_secret(&user.user_id, user.account_label(), &query.code)?;
    Ok(Json(enrollment))
}
