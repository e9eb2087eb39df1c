// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};

use super::CodeQuery;
use crate::{
    auth::Auth, error::ApiError, state::AppState, transaction::TransactionOutcome,
};

/// Set up an empty ticket collection on the user's ledger account.
#[utoipa::path(
    post,
    path = "/api/collections/setup",
    tag = "Assets",
    security(("bearer_auth" = [])),
    params(CodeQuery),
    responses(
        (status = 200, description = "Transaction sealed", body = TransactionOutcome),
        (status = 401, description = "Missing token or invalid code"),
        (status = 409, description = "No provisioned ledger account"),
        (status = 422, description = "Transaction failed on the ledger"),
        (status = 504, description = "Transaction did not seal in time")
    )
)]
pub async fn setup_collection(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> Result<Json<TransactionOutcome>, ApiError> {
    let account = state
        .provisioner
        .signing_account(&user.user_id, &query.code)
        .await?;
    let outcome = state.assets.setup_collection(&account).await?;
    Ok(Json(outcome))
}
