// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ticket NFT listing and minting.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::parse_address;
use crate::{
    assets::{MintRequest, NftDisplay, NftRecord},
    auth::Auth,
    error::ApiError,
    state::AppState,
    transaction::TransactionOutcome,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AddressQuery {
    /// Ledger address, with or without `0x`.
    pub address: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NftListResponse {
    pub nfts: Vec<NftRecord>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NftDisplayListResponse {
    pub displays: Vec<NftDisplay>,
    pub total: usize,
}

/// Ticket metadata to mint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MintNftRequest {
    pub name: String,
    pub description: String,
    /// Thumbnail URL.
    pub url: String,
    /// Grants the organizer role.
    #[serde(default)]
    pub role: bool,
}

/// List the tickets held by an address.
#[utoipa::path(
    get,
    path = "/api/nfts",
    tag = "Assets",
    security(("bearer_auth" = [])),
    params(AddressQuery),
    responses(
        (status = 200, description = "Tickets held", body = NftListResponse),
        (status = 400, description = "Invalid address"),
        (status = 503, description = "Ledger unavailable")
    )
)]
pub async fn list_nfts(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<NftListResponse>, ApiError> {
    let owner = parse_address(&query.address)?;
    let nfts = state.assets.list_nfts(owner).await?;
    Ok(Json(NftListResponse {
        total: nfts.len(),
        nfts,
    }))
}

/// List display metadata of the tickets held by an address.
#[utoipa::path(
    get,
    path = "/api/nfts/displays",
    tag = "Assets",
    security(("bearer_auth" = [])),
    params(AddressQuery),
    responses(
        (status = 200, description = "Ticket displays", body = NftDisplayListResponse),
        (status = 400, description = "Invalid address")
    )
)]
pub async fn list_displays(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<NftDisplayListResponse>, ApiError> {
    let owner = parse_address(&query.address)?;
    let displays = state.assets.list_displays(owner).await?;
    Ok(Json(NftDisplayListResponse {
        total: displays.len(),
        displays,
    }))
}

/// Mint a ticket to `address`, signed by the service account.
#[utoipa::path(
    post,
    path = "/api/nfts/mint",
    tag = "Assets",
    security(("bearer_auth" = [])),
    params(AddressQuery),
    request_body = MintNftRequest,
    responses(
        (status = 200, description = "Transaction sealed", body = TransactionOutcome),
        (status = 400, description = "Invalid address"),
        (status = 422, description = "Transaction failed on the ledger"),
        (status = 503, description = "No service account configured")
    )
)]
pub async fn mint_nft(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<AddressQuery>,
    Json(request): Json<MintNftRequest>,
) -> Result<Json<TransactionOutcome>, ApiError> {
    let recipient = parse_address(&query.address)?;
    let minter = state
        .service_account
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("No service account is configured"))?;

    tracing::info!(user_id = %user.user_id, %recipient, "Minting ticket");
    let outcome = state
        .assets
        .mint_nft(
            minter,
            MintRequest {
                recipient,
                name: request.name,
                description: request.description,
                url: request.url,
                role: request.role,
            },
        )
        .await?;
    Ok(Json(outcome))
}
