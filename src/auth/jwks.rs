// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only
//! - Keys are cached with a configurable TTL (1 hour by default)
//! - Endpoints are tried in declared order; the first returning a
//!   non-empty key array wins
//! - Stale cache is served when every endpoint fails (fail-open for
//!   availability; key-rotation overlap keeps old keys valid)
//!
//! ## Concurrency
//!
//! Concurrent cache-miss refreshes are tolerated: a JWKS document is
//! idempotent data, so racing writers are last-writer-wins under the
//! `RwLock`. Callers during a refresh may observe stale or fresh keys.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::warn;

use super::error::AuthError;

/// Default JWKS cache TTL (1 hour).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Per-endpoint fetch timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// JWKS client with caching and ordered endpoint fallback.
///
/// Constructed once at process start and shared through `AppState`;
/// there is no module-level global.
#[derive(Clone)]
pub struct JwksClient {
    /// Ordered endpoint list (primary well-known path first)
    endpoints: Vec<String>,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached key set
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksClient {
    /// Create a new JWKS client over an ordered endpoint list.
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// The configured endpoint list, in fallback order.
    #[allow(dead_code)]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Get the key set, from cache or by fetching.
    ///
    /// Fallback chain: fresh cache → each endpoint in order → stale cache.
    /// Only when all of those are exhausted does this return
    /// [`AuthError::Unavailable`].
    pub async fn get_key_set(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.is_fresh(self.cache_ttl) {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let mut failures: Vec<String> = Vec::new();

        for endpoint in &self.endpoints {
            match self.fetch_endpoint(endpoint).await {
                Ok(jwks) if !jwks.keys.is_empty() => {
                    let mut cache = self.cache.write().await;
                    *cache = Some(CacheEntry {
                        jwks: jwks.clone(),
                        fetched_at: Instant::now(),
                    });
                    return Ok(jwks);
                }
                Ok(_) => {
                    warn!(endpoint, "JWKS endpoint returned an empty key set");
                    failures.push(format!("{endpoint}: empty key set"));
                }
                Err(e) => {
                    warn!(endpoint, error = %e, "JWKS fetch failed");
                    failures.push(format!("{endpoint}: {e}"));
                }
            }
        }

        // Stale-while-revalidate: an out-of-date key set beats an outage.
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                warn!("all JWKS endpoints failed; serving stale cached key set");
                return Ok(entry.jwks.clone());
            }
        }

        Err(AuthError::Unavailable(failures.join("; ")))
    }

    /// Fetch a key set from one endpoint.
    async fn fetch_endpoint(&self, endpoint: &str) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Unavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))
    }

    /// Resolve a decoding key by `kid`.
    ///
    /// Tokens without a `kid` header fall back to the first usable key in
    /// the set.
    pub async fn get_decoding_key(
        &self,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        let jwks = self.get_key_set().await?;

        match kid {
            Some(kid) => {
                let jwk = jwks
                    .keys
                    .iter()
                    .find(|k| k.common.key_id.as_deref() == Some(kid))
                    .ok_or(AuthError::UnknownKey)?;
                jwk_to_decoding_key(jwk)
            }
            None => {
                for jwk in &jwks.keys {
                    if let Ok(result) = jwk_to_decoding_key(jwk) {
                        return Ok(result);
                    }
                }
                Err(AuthError::UnknownKey)
            }
        }
    }

    /// Check if a fresh key set is currently cached.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.is_fresh(self.cache_ttl),
            None => false,
        }
    }

    /// Force a cache refresh (used by the readiness probe).
    pub async fn refresh(&self) -> Result<(), AuthError> {
        {
            let mut cache = self.cache.write().await;
            *cache = None;
        }
        self.get_key_set().await.map(|_| ())
    }

    /// Seed the cache directly, bypassing the network.
    #[cfg(test)]
    pub(crate) async fn prime_cache(&self, jwks: JwkSet) {
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks,
            fetched_at: Instant::now(),
        });
    }
}

/// Convert a JWK to a DecodingKey plus its verification algorithm.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::Internal(format!("Failed to create RSA key: {e}")))?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::RS256 => Algorithm::RS256,
                    jsonwebtoken::jwk::KeyAlgorithm::RS384 => Algorithm::RS384,
                    jsonwebtoken::jwk::KeyAlgorithm::RS512 => Algorithm::RS512,
                    _ => Algorithm::RS256, // Default for RSA
                })
                .unwrap_or(Algorithm::RS256);

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::Internal(format!("Failed to create EC key: {e}")))?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::ES256 => Algorithm::ES256,
                    jsonwebtoken::jwk::KeyAlgorithm::ES384 => Algorithm::ES384,
                    _ => Algorithm::ES256, // Default for EC
                })
                .unwrap_or(Algorithm::ES256);

            Ok((key, alg))
        }
        _ => Err(AuthError::Internal(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
