// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{parse_address, CodeQuery};
use crate::{
    auth::Auth, error::ApiError, ledger::UFix64, state::AppState,
    transaction::TransactionOutcome,
};

/// FlowToken transfer from the user's account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Decimal amount with at most 8 fractional digits, e.g. `"1.5"`.
    pub amount: String,
    /// Recipient address.
    pub to: String,
}

#[utoipa::path(
    post,
    path = "/api/tokens/transfer",
    tag = "Assets",
    security(("bearer_auth" = [])),
    params(CodeQuery),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transaction sealed", body = TransactionOutcome),
        (status = 400, description = "Invalid amount or address"),
        (status = 401, description = "Missing token or invalid code"),
        (status = 422, description = "Transaction failed on the ledger")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransactionOutcome>, ApiError> {
    let amount = UFix64::parse(&request.amount)
        .map_err(|e| ApiError::bad_request(format!("Invalid amount: {e}")))?;
    let to = parse_address(&request.to)?;

    let sender = state
        .provisioner
        .signing_account(&user.user_id, &query.code)
        .await?;
    let outcome = state.assets.transfer_tokens(&sender, amount, to).await?;
    Ok(Json(outcome))
}
