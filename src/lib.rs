// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Custody - Custodial Flow Key & Asset Service
//!
//! Provisions per-user signing keys into a managed secret vault, gated by a
//! TOTP second factor, and submits signed Flow transactions on the user's
//! behalf.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token authentication
//! - `otp` - TOTP second-factor gate
//! - `vault` - Secret vault adapters (memory, filesystem, GCP Secret Manager)
//! - `provisioning` - Get-or-create of user signing keys
//! - `ledger` - Flow Access API client and ledger primitives
//! - `transaction` - Build, sign, submit and confirm transactions
//! - `assets` - Ticket NFT and FlowToken operations

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod api;
pub mod assets;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod otp;
pub mod provisioning;
pub mod state;
pub mod telemetry;
pub mod transaction;
pub mod vault;

use config::AppConfig;
use state::{AppState, StartupError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve the API until `shutdown` is cancelled.
///
/// Cancelling also aborts in-flight confirmation waits, which then answer
/// with a `Cancelled` error.
pub async fn serve(config: AppConfig, shutdown: CancellationToken) -> Result<(), ServerError> {
    let state = AppState::from_config(&config, shutdown.clone()).await?;
    let app = api::router(state);

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        address = %listener.local_addr()?,
        network = config.network.name,
        "Relational Custody listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
