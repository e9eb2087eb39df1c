// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assets::AssetService;
use crate::auth::JwtVerifier;
use crate::config::{AppConfig, VaultBackend};
use crate::ledger::{FlowRestClient, LedgerClient, LedgerError, NetworkConfig};
use crate::otp::{InMemorySecretStore, SecondFactorGate};
use crate::provisioning::{
    KeyGenerationMode, KeyGenerator, KeyProvisioner, LedgerAccountKeyGenerator,
    RandomKeyGenerator,
};
use crate::transaction::{SigningAccount, TransactionEngine};
use crate::vault::{
    AccessTokenSource, DefaultCredentials, FsVault, GcpSecretManager, InMemoryVault, SecretVault,
    StaticToken, VaultError,
};

/// Failures while wiring the service at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Ledger client: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Vault: {0}")]
    Vault(#[from] VaultError),
}

#[derive(Clone)]
pub struct AppState {
    pub network: NetworkConfig,
    pub jwt: Arc<JwtVerifier>,
    pub gate: Arc<SecondFactorGate>,
    pub provisioner: Arc<KeyProvisioner>,
    pub assets: Arc<AssetService>,
    /// Minter and payer of account creation, when configured.
    pub service_account: Option<SigningAccount>,
}

impl AppState {
    /// Wire services over explicit ledger and vault adapters.
    pub fn new(
        config: &AppConfig,
        ledger: Arc<dyn LedgerClient>,
        vault: Arc<dyn SecretVault>,
        shutdown: CancellationToken,
    ) -> Self {
        let engine = Arc::new(
            TransactionEngine::new(ledger.clone(), shutdown)
                .with_seal_timeout(config.seal_timeout)
                .with_poll_interval(config.poll_interval),
        );
        let service_account = config
            .service_account
            .as_ref()
            .map(|service| service.signing_account());

        let generator: Arc<dyn KeyGenerator> = match (config.key_generation, &service_account) {
            (KeyGenerationMode::Ledger, Some(service)) => Arc::new(LedgerAccountKeyGenerator::new(
                engine.clone(),
                service.clone(),
            )),
            (KeyGenerationMode::Ledger, None) => {
                warn!("Ledger key generation needs a service account, generating local keys");
                Arc::new(RandomKeyGenerator)
            }
            (KeyGenerationMode::Random, _) => Arc::new(RandomKeyGenerator),
        };

        let gate = Arc::new(
            SecondFactorGate::new(Arc::new(InMemorySecretStore::new()))
                .with_issuer(config.totp_issuer.clone())
                .with_period(config.totp_period_secs),
        );

        Self {
            network: config.network,
            jwt: Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes())),
            provisioner: Arc::new(KeyProvisioner::new(vault, gate.clone(), generator)),
            gate,
            assets: Arc::new(AssetService::new(engine, ledger, config.network.contracts)),
            service_account,
        }
    }

    /// Build the ledger client and vault described by `config`.
    pub async fn from_config(
        config: &AppConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, StartupError> {
        let ledger: Arc<dyn LedgerClient> = Arc::new(match &config.access_url {
            Some(url) => FlowRestClient::with_access_url(config.network, url)?,
            None => FlowRestClient::new(config.network)?,
        });

        let vault: Arc<dyn SecretVault> = match &config.vault {
            VaultBackend::Memory => {
                warn!("Using the in-memory vault, keys will not survive a restart");
                Arc::new(InMemoryVault::new())
            }
            VaultBackend::Fs { data_dir } => Arc::new(FsVault::open(data_dir)?),
            VaultBackend::Gcp {
                project_id,
                access_token,
            } => {
                let tokens: Arc<dyn AccessTokenSource> = match access_token {
                    Some(token) => {
                        warn!("Using a fixed Secret Manager token, it will not be refreshed");
                        Arc::new(StaticToken::new(token.clone()))
                    }
                    None => Arc::new(DefaultCredentials::discover().await?),
                };
                Arc::new(GcpSecretManager::new(project_id.clone(), tokens)?)
            }
        };

        info!(
            network = config.network.name,
            key_generation = ?config.key_generation,
            "Services initialized"
        );
        Ok(Self::new(config, ledger, vault, shutdown))
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
