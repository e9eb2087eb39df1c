// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key provisioning endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use super::CodeQuery;
use crate::{
    auth::Auth, error::ApiError, provisioning::KeyMaterialRef, state::AppState,
};

/// Get or create the authenticated user's signing key.
///
/// Requires a current second-factor code. The first successful call creates
/// the key; later calls return the same reference. The private key itself
/// never leaves the vault.
#[utoipa::path(
    get,
    path = "/api/key-management/get-private-key",
    tag = "Keys",
    security(("bearer_auth" = [])),
    params(CodeQuery),
    responses(
        (status = 200, description = "Key reference", body = KeyMaterialRef),
        (status = 401, description = "Missing token or invalid code"),
        (status = 500, description = "Vault or key generation failure")
    )
)]
pub async fn get_private_key(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<KeyMaterialRef>, ApiError> {
    let key = state
        .provisioner
        .provision_key(&user.user_id, &query.code)
        .await?;
    Ok(Json(key))
}
