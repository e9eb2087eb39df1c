// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    assets::{NftDisplay, NftRecord},
    error::ApiError,
    ledger::{Address, Event, TransactionStatus},
    otp::Enrollment,
    provisioning::KeyMaterialRef,
    state::AppState,
    transaction::TransactionOutcome,
};

pub mod collections;
pub mod health;
pub mod keys;
pub mod nfts;
pub mod otp;
pub mod tokens;

/// Second-factor code accompanying a sensitive request.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CodeQuery {
    /// Current one-time code from the user's authenticator app.
    pub code: String,
}

pub(crate) fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_hex(raw).map_err(|e| ApiError::bad_request(format!("Invalid address: {e}")))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/otp/enroll", post(otp::enroll))
        .route("/otp/rotate", post(otp::rotate))
        .route("/key-management/get-private-key", get(keys::get_private_key))
        .route("/collections/setup", post(collections::setup_collection))
        .route("/nfts", get(nfts::list_nfts))
        .route("/nfts/displays", get(nfts::list_displays))
        .route("/nfts/mint", post(nfts::mint_nft))
        .route("/tokens/transfer", post(tokens::transfer));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        otp::enroll,
        otp::rotate,
        keys::get_private_key,
        collections::setup_collection,
        nfts::list_nfts,
        nfts::list_displays,
        nfts::mint_nft,
        tokens::transfer
    ),
    components(
        schemas(
            health::HealthResponse,
            Enrollment,
            KeyMaterialRef,
            TransactionOutcome,
            TransactionStatus,
            Event,
            NftRecord,
            NftDisplay,
            nfts::NftListResponse,
            nfts::NftDisplayListResponse,
            nfts::MintNftRequest,
            tokens::TransferRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Second factor", description = "TOTP enrollment"),
        (name = "Keys", description = "Signing key provisioning"),
        (name = "Assets", description = "Ticket NFTs and FlowToken transfers")
    )
)]
struct ApiDoc;
