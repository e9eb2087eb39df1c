// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded once from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `FLOW_NETWORK` | `testnet`, `mainnet` or `emulator` | `testnet` |
//! | `FLOW_ACCESS_URL` | Override of the network's Access REST endpoint | Network default |
//! | `VAULT_BACKEND` | `memory`, `fs` or `gcp` | `memory` |
//! | `VAULT_DATA_DIR` | Root directory of the `fs` vault | `/data/vault` |
//! | `GOOGLE_PROJECT_ID` | Secret Manager project (`gcp` vault) | Required for `gcp` |
//! | `GOOGLE_OAUTH_ACCESS_TOKEN` | Fixed bearer token for Secret Manager | Application Default Credentials |
//! | `KEY_GENERATION_MODE` | `ledger` or `random` | `random` |
//! | `SERVICE_ACCOUNT_ADDRESS` | Account paying for account creation and minting | Required for `ledger` |
//! | `SERVICE_ACCOUNT_PRIVATE_KEY` | Hex private key of the service account | Required with address |
//! | `SERVICE_ACCOUNT_KEY_INDEX` | Account key index | `0` |
//! | `SERVICE_ACCOUNT_SIGNATURE_ALGORITHM` | `ECDSA_P256` or `ECDSA_secp256k1` | `ECDSA_P256` |
//! | `SERVICE_ACCOUNT_HASH_ALGORITHM` | `SHA3_256` or `SHA2_256` | `SHA3_256` |
//! | `JWT_SECRET` | HS256 secret for access tokens | Required |
//! | `TOTP_ISSUER` | Issuer shown in authenticator apps | `Prague` |
//! | `TOTP_PERIOD_SECS` | Seconds per one-time code | `90` |
//! | `SEAL_TIMEOUT_SECS` | Max wait for a transaction to seal | `60` |
//! | `POLL_INTERVAL_MS` | Delay between status polls | `1000` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ledger::{Address, NetworkConfig, FLOW_TESTNET};
use crate::otp::{DEFAULT_ISSUER, DEFAULT_PERIOD_SECS};
use crate::provisioning::KeyGenerationMode;
use crate::transaction::{
    AccountSigner, HashAlgorithm, PrivateKey, SignatureAlgorithm, SigningAccount,
    DEFAULT_POLL_INTERVAL, DEFAULT_SEAL_TIMEOUT,
};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const FLOW_NETWORK_ENV: &str = "FLOW_NETWORK";
pub const FLOW_ACCESS_URL_ENV: &str = "FLOW_ACCESS_URL";
pub const VAULT_BACKEND_ENV: &str = "VAULT_BACKEND";
pub const VAULT_DATA_DIR_ENV: &str = "VAULT_DATA_DIR";
pub const GOOGLE_PROJECT_ID_ENV: &str = "GOOGLE_PROJECT_ID";
pub const GOOGLE_OAUTH_ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const KEY_GENERATION_MODE_ENV: &str = "KEY_GENERATION_MODE";
pub const SERVICE_ACCOUNT_ADDRESS_ENV: &str = "SERVICE_ACCOUNT_ADDRESS";
pub const SERVICE_ACCOUNT_PRIVATE_KEY_ENV: &str = "SERVICE_ACCOUNT_PRIVATE_KEY";
pub const SERVICE_ACCOUNT_KEY_INDEX_ENV: &str = "SERVICE_ACCOUNT_KEY_INDEX";
pub const SERVICE_ACCOUNT_SIGNATURE_ALGORITHM_ENV: &str = "SERVICE_ACCOUNT_SIGNATURE_ALGORITHM";
pub const SERVICE_ACCOUNT_HASH_ALGORITHM_ENV: &str = "SERVICE_ACCOUNT_HASH_ALGORITHM";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOTP_ISSUER_ENV: &str = "TOTP_ISSUER";
pub const TOTP_PERIOD_SECS_ENV: &str = "TOTP_PERIOD_SECS";
pub const SEAL_TIMEOUT_SECS_ENV: &str = "SEAL_TIMEOUT_SECS";
pub const POLL_INTERVAL_MS_ENV: &str = "POLL_INTERVAL_MS";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_VAULT_DATA_DIR: &str = "/data/vault";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Where user keys are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultBackend {
    Memory,
    Fs { data_dir: PathBuf },
    /// Without `access_token`, tokens come from Application Default Credentials.
    Gcp {
        project_id: String,
        access_token: Option<String>,
    },
}

/// Ledger account used to pay for account creation and to mint.
#[derive(Clone)]
pub struct ServiceAccountConfig {
    pub address: Address,
    pub key_index: u32,
    pub private_key: PrivateKey,
    pub hash_algorithm: HashAlgorithm,
}

impl ServiceAccountConfig {
    pub fn signing_account(&self) -> SigningAccount {
        SigningAccount {
            address: self.address,
            key_index: self.key_index,
            signer: AccountSigner::new(self.private_key.clone(), self.hash_algorithm),
        }
    }
}

impl fmt::Debug for ServiceAccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountConfig")
            .field("address", &self.address)
            .field("key_index", &self.key_index)
            .field("signature_algorithm", &self.private_key.algorithm())
            .field("hash_algorithm", &self.hash_algorithm)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub network: NetworkConfig,
    pub access_url: Option<String>,
    pub vault: VaultBackend,
    pub key_generation: KeyGenerationMode,
    pub service_account: Option<ServiceAccountConfig>,
    pub jwt_secret: String,
    pub totp_issuer: String,
    pub totp_period_secs: u64,
    pub seal_timeout: Duration,
    pub poll_interval: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("network", &self.network.name)
            .field("access_url", &self.access_url)
            .field("key_generation", &self.key_generation)
            .field("service_account", &self.service_account)
            .field("totp_issuer", &self.totp_issuer)
            .field("seal_timeout", &self.seal_timeout)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match get(FLOW_NETWORK_ENV) {
            Some(raw) => NetworkConfig::by_name(&raw).ok_or_else(|| ConfigError::Invalid {
                var: FLOW_NETWORK_ENV,
                message: format!("unknown network `{raw}`"),
            })?,
            None => FLOW_TESTNET,
        };

        let vault = match get(VAULT_BACKEND_ENV).as_deref().map(str::to_ascii_lowercase) {
            None => VaultBackend::Memory,
            Some(backend) => match backend.as_str() {
                "memory" => VaultBackend::Memory,
                "fs" => VaultBackend::Fs {
                    data_dir: get(VAULT_DATA_DIR_ENV)
                        .unwrap_or_else(|| DEFAULT_VAULT_DATA_DIR.to_string())
                        .into(),
                },
                "gcp" => VaultBackend::Gcp {
                    project_id: get(GOOGLE_PROJECT_ID_ENV)
                        .ok_or(ConfigError::Missing(GOOGLE_PROJECT_ID_ENV))?,
                    access_token: get(GOOGLE_OAUTH_ACCESS_TOKEN_ENV),
                },
                other => {
                    return Err(ConfigError::Invalid {
                        var: VAULT_BACKEND_ENV,
                        message: format!("unknown backend `{other}`"),
                    })
                }
            },
        };

        let service_account = match get(SERVICE_ACCOUNT_ADDRESS_ENV) {
            None => None,
            Some(raw) => {
                let algorithm = parse_or(
                    &get,
                    SERVICE_ACCOUNT_SIGNATURE_ALGORITHM_ENV,
                    SignatureAlgorithm::EcdsaP256,
                )?;
                Some(ServiceAccountConfig {
                    address: Address::from_hex(&raw).map_err(|e| ConfigError::Invalid {
                        var: SERVICE_ACCOUNT_ADDRESS_ENV,
                        message: e.to_string(),
                    })?,
                    private_key: get(SERVICE_ACCOUNT_PRIVATE_KEY_ENV)
                        .ok_or(ConfigError::Missing(SERVICE_ACCOUNT_PRIVATE_KEY_ENV))
                        .and_then(|k| {
                            PrivateKey::from_hex_for(algorithm, &k).map_err(|e| {
                                ConfigError::Invalid {
                                    var: SERVICE_ACCOUNT_PRIVATE_KEY_ENV,
                                    message: e.to_string(),
                                }
                            })
                        })?,
                    key_index: parse_or(&get, SERVICE_ACCOUNT_KEY_INDEX_ENV, 0)?,
                    hash_algorithm: parse_or(
                        &get,
                        SERVICE_ACCOUNT_HASH_ALGORITHM_ENV,
                        HashAlgorithm::Sha3_256,
                    )?,
                })
            }
        };

        let key_generation = parse_or(&get, KEY_GENERATION_MODE_ENV, KeyGenerationMode::Random)?;
        if key_generation == KeyGenerationMode::Ledger && service_account.is_none() {
            return Err(ConfigError::Missing(SERVICE_ACCOUNT_ADDRESS_ENV));
        }

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, PORT_ENV, 8080)?,
            log_format: parse_or(&get, LOG_FORMAT_ENV, LogFormat::Pretty)?,
            network,
            access_url: get(FLOW_ACCESS_URL_ENV),
            vault,
            key_generation,
            service_account,
            jwt_secret: get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?,
            totp_issuer: get(TOTP_ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            totp_period_secs: parse_or(&get, TOTP_PERIOD_SECS_ENV, DEFAULT_PERIOD_SECS)?,
            seal_timeout: Duration::from_secs(parse_or(
                &get,
                SEAL_TIMEOUT_SECS_ENV,
                DEFAULT_SEAL_TIMEOUT.as_secs(),
            )?),
            poll_interval: Duration::from_millis(parse_or(
                &get,
                POLL_INTERVAL_MS_ENV,
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ledger::FLOW_EMULATOR;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_jwt_secret() {
        let config = load(&[(JWT_SECRET_ENV, "s3cret")]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.network, FLOW_TESTNET);
        assert_eq!(config.vault, VaultBackend::Memory);
        assert_eq!(config.key_generation, KeyGenerationMode::Random);
        assert_eq!(config.totp_issuer, "Prague");
        assert_eq!(config.totp_period_secs, 90);
        assert_eq!(config.seal_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.service_account.is_none());
    }

    #[test]
    fn jwt_secret_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing(JWT_SECRET_ENV));
    }

    #[test]
    fn ledger_mode_requires_service_account() {
        let err = load(&[(JWT_SECRET_ENV, "s"), (KEY_GENERATION_MODE_ENV, "ledger")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(SERVICE_ACCOUNT_ADDRESS_ENV));

        let key = PrivateKey::generate_for(SignatureAlgorithm::EcdsaP256).to_hex();
        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (KEY_GENERATION_MODE_ENV, "ledger"),
            (SERVICE_ACCOUNT_ADDRESS_ENV, "0xf8d6e0586b0a20c7"),
            (SERVICE_ACCOUNT_PRIVATE_KEY_ENV, &key),
            (SERVICE_ACCOUNT_KEY_INDEX_ENV, "2"),
        ])
        .unwrap();
        let service = config.service_account.unwrap();
        assert_eq!(service.key_index, 2);
        assert_eq!(service.hash_algorithm, HashAlgorithm::Sha3_256);
        let signer = service.signing_account().signer;
        assert_eq!(signer.key.to_hex(), key);
        assert_eq!(signer.signature_algorithm, SignatureAlgorithm::EcdsaP256);
        assert!(!format!("{service:?}").contains(&key));
    }

    #[test]
    fn service_account_curve_is_configurable() {
        let key = PrivateKey::generate().to_hex();
        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (SERVICE_ACCOUNT_ADDRESS_ENV, "0xf8d6e0586b0a20c7"),
            (SERVICE_ACCOUNT_PRIVATE_KEY_ENV, &key),
            (SERVICE_ACCOUNT_SIGNATURE_ALGORITHM_ENV, "ECDSA_secp256k1"),
            (SERVICE_ACCOUNT_HASH_ALGORITHM_ENV, "SHA2_256"),
        ])
        .unwrap();
        let signer = config.service_account.unwrap().signing_account().signer;
        assert_eq!(signer.signature_algorithm, SignatureAlgorithm::EcdsaSecp256k1);
        assert_eq!(signer.hash_algorithm, HashAlgorithm::Sha2_256);

        let err = load(&[
            (JWT_SECRET_ENV, "s"),
            (SERVICE_ACCOUNT_ADDRESS_ENV, "0xf8d6e0586b0a20c7"),
            (SERVICE_ACCOUNT_PRIVATE_KEY_ENV, &key),
            (SERVICE_ACCOUNT_SIGNATURE_ALGORITHM_ENV, "ed25519"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: SERVICE_ACCOUNT_SIGNATURE_ALGORITHM_ENV, .. }
        ));
    }

    #[test]
    fn gcp_backend_requires_project() {
        let err = load(&[(JWT_SECRET_ENV, "s"), (VAULT_BACKEND_ENV, "gcp")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(GOOGLE_PROJECT_ID_ENV));

        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (VAULT_BACKEND_ENV, "GCP"),
            (GOOGLE_PROJECT_ID_ENV, "custody"),
            (GOOGLE_OAUTH_ACCESS_TOKEN_ENV, "ya29.token"),
        ])
        .unwrap();
        assert_eq!(
            config.vault,
            VaultBackend::Gcp {
                project_id: "custody".into(),
                access_token: Some("ya29.token".into()),
            }
        );
    }

    #[test]
    fn gcp_token_defaults_to_application_credentials() {
        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (VAULT_BACKEND_ENV, "gcp"),
            (GOOGLE_PROJECT_ID_ENV, "custody"),
        ])
        .unwrap();
        assert_eq!(
            config.vault,
            VaultBackend::Gcp {
                project_id: "custody".into(),
                access_token: None,
            }
        );
    }

    #[test]
    fn parses_overrides() {
        let config = load(&[
            (JWT_SECRET_ENV, "s"),
            (PORT_ENV, "9000"),
            (LOG_FORMAT_ENV, "json"),
            (FLOW_NETWORK_ENV, "emulator"),
            (VAULT_BACKEND_ENV, "fs"),
            (VAULT_DATA_DIR_ENV, "/tmp/v"),
            (POLL_INTERVAL_MS_ENV, "250"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.network, FLOW_EMULATOR);
        assert_eq!(
            config.vault,
            VaultBackend::Fs {
                data_dir: "/tmp/v".into()
            }
        );
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "s"), (PORT_ENV, "http")]),
            Err(ConfigError::Invalid { var: PORT_ENV, .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "s"), (FLOW_NETWORK_ENV, "devnet")]),
            Err(ConfigError::Invalid { var: FLOW_NETWORK_ENV, .. })
        ));
    }
}
