// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::{AuthGateway, FederatedTokenVerifier, JwksClient, TokenCodec};
use crate::config::AuthSettings;
use crate::session::lockout::LockoutPolicy;
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    pub codec: Arc<TokenCodec>,
    pub gateway: Arc<AuthGateway>,
    /// Shared with the gateway's federated verifier; kept here for the
    /// readiness probe. `None` when no identity provider is configured.
    pub jwks: Option<Arc<JwksClient>>,
    pub lockout: LockoutPolicy,
    pub settings: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(settings: AuthSettings, store: InMemoryStore) -> Self {
        let store = Arc::new(RwLock::new(store));
        let codec = Arc::new(TokenCodec::new(
            settings.jwt_secret.as_bytes(),
            settings.jwt_issuer.clone(),
            settings.jwt_audience.clone(),
        ));

        let jwks = settings
            .identity_provider_url
            .as_ref()
            .map(|_| Arc::new(JwksClient::new(settings.jwks_endpoints())));

        let federated = match (&jwks, &settings.identity_provider_url) {
            (Some(jwks), Some(provider)) => Some(FederatedTokenVerifier::new(
                jwks.clone(),
                provider.clone(),
                settings.identity_provider_audience.clone(),
            )),
            _ => None,
        };

        let gateway = Arc::new(AuthGateway::new(codec.clone(), federated, store.clone()));

        Self {
            store,
            codec,
            gateway,
            jwks,
            lockout: LockoutPolicy::default(),
            settings: Arc::new(settings),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(AuthSettings::for_tests(), InMemoryStore::new())
    }
}
