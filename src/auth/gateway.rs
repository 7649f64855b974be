// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential resolution entry point.
//!
//! The gateway is the single place where a raw bearer token becomes an
//! [`Identity`]. It classifies the token by signing algorithm, dispatches
//! to the first-party codec or the federated verifier, and (for
//! first-party tokens) re-checks the subject against the credential store
//! so that deleted accounts lose access immediately, not at token expiry.
//!
//! ## Security
//!
//! - Classification reads only the unverified header; no claim from the
//!   header is trusted beyond routing the token to a verifier
//! - `resolve` never fails: every verification error collapses to
//!   [`Identity::Anonymous`], with the specific kind logged server-side
//! - `authenticate` keeps the error for callers that must distinguish
//!   "bad token" (401) from "keys unavailable" (503)

use std::sync::Arc;

use jsonwebtoken::{decode_header, Algorithm};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::claims::{Identity, UserIdentity};
use super::codec::TokenCodec;
use super::error::AuthError;
use super::federated::FederatedTokenVerifier;
use crate::store::InMemoryStore;

/// Verification scheme a token belongs to, read from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScheme {
    /// HS256, signed by this service
    FirstParty,
    /// RS256/ES256, signed by the identity provider
    Federated,
}

/// Classify a token by its (unverified) header algorithm.
///
/// Any algorithm outside the two known schemes is rejected here, before
/// key material is involved.
pub fn classify(token: &str) -> Result<TokenScheme, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::Malformed)?;
    match header.alg {
        Algorithm::HS256 => Ok(TokenScheme::FirstParty),
        Algorithm::RS256 | Algorithm::ES256 => Ok(TokenScheme::Federated),
        _ => Err(AuthError::UnsupportedAlgorithm),
    }
}

/// Dual-scheme credential resolver.
pub struct AuthGateway {
    codec: Arc<TokenCodec>,
    /// Absent when no identity provider is configured
    federated: Option<FederatedTokenVerifier>,
    store: Arc<RwLock<InMemoryStore>>,
}

impl AuthGateway {
    pub fn new(
        codec: Arc<TokenCodec>,
        federated: Option<FederatedTokenVerifier>,
        store: Arc<RwLock<InMemoryStore>>,
    ) -> Self {
        Self {
            codec,
            federated,
            store,
        }
    }

    /// Verify a token and resolve it to an identity, preserving the error.
    ///
    /// Used by the `Auth` extractor, which maps [`AuthError::Unavailable`]
    /// to a 503 instead of blaming the client's credential.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        match classify(token)? {
            TokenScheme::FirstParty => {
                let claims = self.codec.verify(token)?;
                let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::Malformed)?;
                self.lookup_user(user_id).await
            }
            TokenScheme::Federated => {
                let verifier = self
                    .federated
                    .as_ref()
                    .ok_or(AuthError::UnsupportedAlgorithm)?;
                let claims = verifier.verify(token).await?;
                Ok(Identity::Federated(claims.into()))
            }
        }
    }

    /// Resolve a token to an identity, collapsing every failure to
    /// [`Identity::Anonymous`].
    ///
    /// This is the infallible form the rest of the platform consumes: a
    /// bad credential degrades to an anonymous request rather than an
    /// error. The failure kind still reaches the logs.
    pub async fn resolve(&self, token: &str) -> Identity {
        match self.authenticate(token).await {
            Ok(identity) => identity,
            Err(e @ (AuthError::Unavailable(_) | AuthError::Internal(_))) => {
                warn!(kind = e.kind(), error = %e, "credential resolution degraded");
                Identity::Anonymous
            }
            Err(e) => {
                debug!(kind = e.kind(), "credential rejected");
                Identity::Anonymous
            }
        }
    }

    /// Load a first-party identity from the store.
    ///
    /// A valid signature is not enough: the account must still exist and
    /// not be soft-deleted.
    async fn lookup_user(&self, user_id: i64) -> Result<Identity, AuthError> {
        let store = self.store.read().await;
        let user = store
            .get_user(user_id)
            .filter(|u| !u.is_deleted())
            .ok_or(AuthError::InvalidCredential)?;

        Ok(Identity::User(UserIdentity {
            user_id: user.id,
            email: user.email.clone(),
            email_verified: user.email_verified,
            role: user.role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    async fn gateway_with_user() -> (AuthGateway, i64, Arc<RwLock<InMemoryStore>>) {
        let mut store = InMemoryStore::new();
        let user = store
            .create_user(
                "gate@example.com",
                "argon2-hash-placeholder",
                Some("Gate Keeper"),
                Utc::now(),
            )
            .unwrap();
        let user_id = user.id;

        let store = Arc::new(RwLock::new(store));
        let codec = Arc::new(TokenCodec::new(TEST_SECRET, "marketplace-api", "marketplace"));
        let gateway = AuthGateway::new(codec, None, store.clone());
        (gateway, user_id, store)
    }

    fn token_for(user_id: i64) -> String {
        TokenCodec::new(TEST_SECRET, "marketplace-api", "marketplace")
            .issue(&user_id.to_string(), Duration::minutes(15), Utc::now())
            .unwrap()
    }

    #[test]
    fn classification_by_header_algorithm() {
        let hs256 = token_for(1);
        assert_eq!(classify(&hs256).unwrap(), TokenScheme::FirstParty);
        assert!(matches!(classify("garbage"), Err(AuthError::Malformed)));
    }

    #[test]
    fn hs384_is_not_a_known_scheme() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS384),
            &serde_json::json!({"sub": "1", "exp": 4102444800i64}),
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();
        assert!(matches!(
            classify(&token),
            Err(AuthError::UnsupportedAlgorithm)
        ));
    }

    #[tokio::test]
    async fn first_party_token_resolves_to_user() {
        let (gateway, user_id, _store) = gateway_with_user().await;

        let identity = gateway.resolve(&token_for(user_id)).await;
        match identity {
            Identity::User(user) => {
                assert_eq!(user.user_id, user_id);
                assert_eq!(user.email, "gate@example.com");
            }
            other => panic!("expected first-party identity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_subject_resolves_anonymous() {
        let (gateway, _user_id, _store) = gateway_with_user().await;
        assert!(gateway.resolve(&token_for(999_999)).await.is_anonymous());
    }

    #[tokio::test]
    async fn deleted_account_loses_access_before_token_expiry() {
        let (gateway, user_id, store) = gateway_with_user().await;
        let token = token_for(user_id);

        // Valid while the account exists.
        assert!(!gateway.resolve(&token).await.is_anonymous());

        store.write().await.soft_delete_user(user_id, Utc::now());

        // Same still-unexpired token, now anonymous.
        assert!(gateway.resolve(&token).await.is_anonymous());
        assert!(matches!(
            gateway.authenticate(&token).await,
            Err(AuthError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn garbage_token_resolves_anonymous() {
        let (gateway, _user_id, _store) = gateway_with_user().await;
        assert!(gateway.resolve("not-a-token").await.is_anonymous());
        assert!(gateway.resolve("").await.is_anonymous());
    }

    #[tokio::test]
    async fn federated_token_without_provider_resolves_anonymous() {
        let (gateway, _user_id, _store) = gateway_with_user().await;

        // RS256-shaped header, but no federated verifier configured.
        let header = jsonwebtoken::Header::new(Algorithm::RS256);
        let token = format!(
            "{}.e30.c2ln",
            base64::Engine::encode(
                &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                serde_json::to_vec(&header).unwrap()
            )
        );

        assert!(matches!(
            gateway.authenticate(&token).await,
            Err(AuthError::UnsupportedAlgorithm)
        ));
        assert!(gateway.resolve(&token).await.is_anonymous());
    }
}
