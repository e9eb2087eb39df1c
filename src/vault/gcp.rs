// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google Secret Manager REST backend.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create | `POST /v1/projects/{p}/secrets?secretId={id}` |
//! | read latest | `GET /v1/projects/{p}/secrets/{id}/versions/latest:access` |
//! | append | `POST /v1/projects/{p}/secrets/{id}:addVersion` |
//!
//! Reading a container without versions returns 404 just like a missing
//! container, so a 404 on access is followed by a metadata lookup to tell
//! `Empty` from `NotFound`.
//!
//! Every request asks its [`AccessTokenSource`] for a bearer token.
//! [`DefaultCredentials`] resolves Application Default Credentials and
//! refreshes tokens before they expire; [`StaticToken`] serves a fixed token.

use std::sync::Arc;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{validate_secret_id, SecretLookup, SecretVault, SecretVersion, VaultError};

/// Production API endpoint.
pub const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

/// OAuth scope granting Secret Manager access.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplier of bearer tokens for Secret Manager requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn token(&self) -> Result<String, VaultError>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`. Expires after
/// about an hour.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn token(&self) -> Result<String, VaultError> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials with cached, refreshing tokens.
pub struct DefaultCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl DefaultCredentials {
    pub async fn discover() -> Result<Self, VaultError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| VaultError::PermissionDenied(format!("no Google credentials: {e}")))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for DefaultCredentials {
    async fn token(&self) -> Result<String, VaultError> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| VaultError::PermissionDenied(format!("token refresh failed: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

pub struct GcpSecretManager {
    base_url: Url,
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
    http: reqwest::Client,
}

impl GcpSecretManager {
    pub fn new(
        project_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, VaultError> {
        Self::with_base_url(SECRET_MANAGER_URL, project_id, tokens)
    }

    pub fn with_base_url(
        base_url: &str,
        project_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, VaultError> {
        let base_url = base_url
            .parse()
            .map_err(|e: url::ParseError| VaultError::Transport(format!("invalid vault URL: {e}")))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            project_id: project_id.into(),
            tokens,
            http,
        })
    }

    fn url(&self, path: &str) -> Result<Url, VaultError> {
        self.base_url
            .join(&format!("/v1/projects/{}/{path}", self.project_id))
            .map_err(|e| VaultError::Transport(format!("invalid vault URL: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, VaultError> {
        let token = self.tokens.token().await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))
    }

    /// Whether the container exists, used to disambiguate a 404 on access.
    async fn secret_exists(&self, secret_id: &str) -> Result<bool, VaultError> {
        let response = self
            .send(self.http.get(self.url(&format!("secrets/{secret_id}"))?))
            .await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(secret_id, response).await),
        }
    }
}

#[derive(Deserialize)]
struct AccessResponse {
    name: String,
    payload: Payload,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    data: String,
}

#[derive(Deserialize)]
struct VersionResponse {
    name: String,
}

#[derive(Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    message: String,
}

/// Map an HTTP failure status onto the vault taxonomy.
fn classify(status: StatusCode, message: String) -> VaultError {
    match status {
        StatusCode::NOT_FOUND => VaultError::NotFound(message),
        StatusCode::CONFLICT => VaultError::AlreadyExists(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VaultError::PermissionDenied(message),
        _ => VaultError::Transport(format!("{status}: {message}")),
    }
}

async fn error_from_response(secret_id: &str, response: reqwest::Response) -> VaultError {
    let status = response.status();
    let message = response
        .json::<GoogleError>()
        .await
        .map(|e| e.error.message)
        .unwrap_or_else(|_| secret_id.to_string());
    classify(status, message)
}

/// Trailing version number of `projects/p/secrets/s/versions/{n}`.
fn version_from_name(name: &str) -> Result<u64, VaultError> {
    name.rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| VaultError::Transport(format!("unexpected version name: {name}")))
}

#[async_trait]
impl SecretVault for GcpSecretManager {
    async fn create_secret(&self, secret_id: &str) -> Result<(), VaultError> {
        validate_secret_id(secret_id)?;
        let mut url = self.url("secrets")?;
        url.query_pairs_mut().append_pair("secretId", secret_id);

        let body = json!({ "replication": { "automatic": {} } });
        let response = self.send(self.http.post(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(secret_id, response).await);
        }
        debug!(secret_id, "Created secret container");
        Ok(())
    }

    async fn access_latest_version(&self, secret_id: &str) -> Result<SecretLookup, VaultError> {
        validate_secret_id(secret_id)?;
        let url = self.url(&format!("secrets/{secret_id}/versions/latest:access"))?;
        let response = self.send(self.http.get(url)).await?;

        match response.status() {
            s if s.is_success() => {
                let body: AccessResponse = response
                    .json()
                    .await
                    .map_err(|e| VaultError::Transport(e.to_string()))?;
                let data = Base64::decode_vec(&body.payload.data)
                    .map_err(|e| VaultError::Transport(format!("invalid payload: {e}")))?;
                Ok(SecretLookup::Found(SecretVersion {
                    secret_id: secret_id.to_string(),
                    version: version_from_name(&body.name)?,
                    data,
                }))
            }
            StatusCode::NOT_FOUND => {
                if self.secret_exists(secret_id).await? {
                    Ok(SecretLookup::Empty)
                } else {
                    Ok(SecretLookup::NotFound)
                }
            }
            _ => Err(error_from_response(secret_id, response).await),
        }
    }

    async fn add_version(&self, secret_id: &str, data: &[u8]) -> Result<u64, VaultError> {
        validate_secret_id(secret_id)?;
        let url = self.url(&format!("secrets/{secret_id}:addVersion"))?;
        let body = json!({ "payload": Payload { data: Base64::encode_string(data) } });

        let response = self.send(self.http.post(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(secret_id, response).await);
        }
        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;
        version_from_name(&body.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            classify(StatusCode::NOT_FOUND, "x".into()),
            VaultError::NotFound("x".into())
        );
        assert_eq!(
            classify(StatusCode::CONFLICT, "x".into()),
            VaultError::AlreadyExists("x".into())
        );
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, "x".into()),
            VaultError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "x".into()),
            VaultError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, "x".into()),
            VaultError::Transport(_)
        ));
    }

    #[test]
    fn parses_version_names() {
        assert_eq!(
            version_from_name("projects/p/secrets/1-privatekey/versions/3").unwrap(),
            3
        );
        assert!(version_from_name("projects/p/secrets/s/versions/latest").is_err());
    }

    #[test]
    fn urls_are_project_scoped() {
        let vault = GcpSecretManager::with_base_url(
            "http://localhost:9000",
            "proj",
            Arc::new(StaticToken::new("token")),
        )
        .unwrap();
        assert_eq!(
            vault.url("secrets/a:addVersion").unwrap().as_str(),
            "http://localhost:9000/v1/projects/proj/secrets/a:addVersion"
        );
    }

    /// Hands out `t1`, `t2`, ... so each request shows which token it used.
    struct CountingTokens(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl AccessTokenSource for CountingTokens {
        async fn token(&self) -> Result<String, VaultError> {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            Ok(format!("t{n}"))
        }
    }

    struct FailingTokens;

    #[async_trait]
    impl AccessTokenSource for FailingTokens {
        async fn token(&self) -> Result<String, VaultError> {
            Err(VaultError::PermissionDenied("credentials revoked".into()))
        }
    }

    /// Secret Manager stand-in that 404s everything and records bearer tokens.
    async fn recording_server() -> (String, Arc<std::sync::Mutex<Vec<String>>>) {
        use axum::http::{header::AUTHORIZATION, HeaderMap};

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = axum::Router::new().fallback(move |headers: HeaderMap| {
            let recorder = recorder.clone();
            async move {
                let auth = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                recorder.lock().unwrap().push(auth);
                (
                    axum::http::StatusCode::NOT_FOUND,
                    axum::Json(json!({"error": {"message": "not found"}})),
                )
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{address}"), seen)
    }

    #[tokio::test]
    async fn every_request_fetches_a_fresh_token() {
        let (url, seen) = recording_server().await;
        let tokens = Arc::new(CountingTokens(std::sync::atomic::AtomicUsize::new(0)));
        let vault = GcpSecretManager::with_base_url(&url, "proj", tokens).unwrap();

        assert_eq!(
            vault.access_latest_version("a-privatekey").await.unwrap(),
            SecretLookup::NotFound
        );
        assert_eq!(
            vault.access_latest_version("a-privatekey").await.unwrap(),
            SecretLookup::NotFound
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Bearer t1", "Bearer t2", "Bearer t3", "Bearer t4"]
        );
    }

    #[tokio::test]
    async fn token_failures_stop_the_request() {
        let (url, seen) = recording_server().await;
        let vault = GcpSecretManager::with_base_url(&url, "proj", Arc::new(FailingTokens)).unwrap();

        assert!(matches!(
            vault.create_secret("a-privatekey").await,
            Err(VaultError::PermissionDenied(_))
        ));
        assert!(seen.lock().unwrap().is_empty());
    }
}
