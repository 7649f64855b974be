// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. A missing or
//! unusable required variable aborts startup; the process never runs
//! with a default signing secret.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret, at least 32 bytes | Required |
//! | `JWT_ISSUER` | `iss` claim on issued tokens | `marketplace-api` |
//! | `JWT_AUDIENCE` | `aud` claim on issued tokens | `marketplace` |
//! | `IDENTITY_PROVIDER_URL` | Federated provider base URL | Optional |
//! | `IDENTITY_PROVIDER_AUDIENCE` | Expected `aud` on federated tokens | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use chrono::Duration;
use thiserror::Error;
use url::Url;

/// Access tokens are short-lived; sessions persist via refresh rotation.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the authentication service needs from the environment.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Federated provider base URL; `None` disables the federated scheme
    pub identity_provider_url: Option<String>,
    pub identity_provider_audience: Option<String>,
}

impl AuthSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            Err(_) => 8080,
        };

        let identity_provider_url = match std::env::var("IDENTITY_PROVIDER_URL") {
            Ok(raw) => {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    name: "IDENTITY_PROVIDER_URL",
                    reason: format!("{e}"),
                })?;
                Some(raw.trim_end_matches('/').to_string())
            }
            Err(_) => None,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "marketplace-api".to_string()),
            jwt_audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "marketplace".to_string()),
            identity_provider_url,
            identity_provider_audience: std::env::var("IDENTITY_PROVIDER_AUDIENCE").ok(),
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(REFRESH_TOKEN_TTL_DAYS)
    }

    /// JWKS endpoints for the configured provider, in fallback order.
    ///
    /// Providers expose the key set at one of two well-known paths
    /// depending on whether an auth sub-service fronts it; both are
    /// tried, deeper path first.
    pub fn jwks_endpoints(&self) -> Vec<String> {
        match &self.identity_provider_url {
            Some(base) => vec![
                format!("{base}/auth/v1/.well-known/jwks.json"),
                format!("{base}/.well-known/jwks.json"),
            ],
            None => Vec::new(),
        }
    }

    /// Settings for tests: fixed secret, no federated provider.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            jwt_issuer: "marketplace-api".to_string(),
            jwt_audience: "marketplace".to_string(),
            identity_provider_url: None,
            identity_provider_audience: None,
        }
    }
}
