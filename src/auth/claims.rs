// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and resolved identity representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Claims carried by a first-party access token (HS256).
///
/// First-party tokens are signed, never stored. `iss` and `aud` are
/// optional on the wire for backward compatibility with tokens minted
/// before those claims were introduced; see [`crate::auth::TokenCodec`]
/// for the exact accept/reject rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the first-party user id, as a decimal string
    pub sub: String,

    /// Issuer (optional for pre-claim tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience (optional for pre-claim tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration timestamp (Unix seconds)
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,
}

/// Claims consumed from a federated (identity-provider-issued) token.
///
/// Only `sub` and `exp` are required; everything else is best-effort
/// identity data. The provider, not this service, is authoritative for
/// these fields, so no local user row is involved.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedClaims {
    /// Provider-issued subject (opaque UUID)
    pub sub: String,

    /// Issuer (provider URL)
    #[serde(default)]
    pub iss: String,

    /// Audience; providers emit either a string or an array
    #[serde(default)]
    #[allow(dead_code)]
    pub aud: Option<serde_json::Value>,

    /// Expiration timestamp
    pub exp: i64,

    /// Email, if the provider shares it
    #[serde(default)]
    pub email: Option<String>,

    /// Boolean verified flag (OIDC-style providers)
    #[serde(default)]
    pub email_verified: Option<bool>,

    /// Confirmation timestamp (Supabase-style providers)
    #[serde(default)]
    pub email_confirmed_at: Option<String>,

    /// Provider user metadata
    #[serde(default)]
    pub user_metadata: Option<FederatedUserMetadata>,
}

/// Nested `user_metadata` object from the provider.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FederatedUserMetadata {
    /// Display name set at the provider
    #[serde(default)]
    pub full_name: Option<String>,
}

impl FederatedClaims {
    /// Whether the provider attests the email as verified.
    ///
    /// Providers disagree on the claim shape: OIDC uses a boolean
    /// `email_verified`, Supabase emits an `email_confirmed_at` timestamp.
    /// Either form counts.
    pub fn email_is_verified(&self) -> bool {
        self.email_verified.unwrap_or(false) || self.email_confirmed_at.is_some()
    }
}

/// A first-party identity resolved against the credential store.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserIdentity {
    /// Local user id
    pub user_id: i64,
    /// Normalized email
    pub email: String,
    /// Whether the email has been verified
    pub email_verified: bool,
    /// Role from the user row
    pub role: crate::models::Role,
}

/// A federated identity, read straight from verified token claims.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FederatedIdentity {
    /// Provider-issued subject
    pub subject: Uuid,
    /// Email from claims, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name from provider metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Whether the provider attests the email as verified
    pub email_verified: bool,
}

/// Outcome of credential resolution.
///
/// This is the only value the rest of the platform sees: an authenticated
/// identity or `Anonymous`. Every verification failure collapses here.
#[derive(Debug, Clone)]
pub enum Identity {
    /// First-party user backed by a store row
    User(UserIdentity),
    /// Federated user backed by provider claims only
    Federated(FederatedIdentity),
    /// No (valid) credential
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// First-party user id, if this is a first-party identity.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::User(user) => Some(user.user_id),
            _ => None,
        }
    }
}

impl From<FederatedClaims> for FederatedIdentity {
    fn from(claims: FederatedClaims) -> Self {
        let email_verified = claims.email_is_verified();
        Self {
            subject: Uuid::parse_str(&claims.sub).unwrap_or(Uuid::nil()),
            email: claims.email,
            full_name: claims.user_metadata.and_then(|m| m.full_name),
            email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> FederatedClaims {
        FederatedClaims {
            sub: "7a5f1b2e-9c43-4f7a-8d21-0c3e5a6b7d8f".to_string(),
            iss: "https://id.example.dev".to_string(),
            aud: Some(serde_json::json!("marketplace")),
            exp: 4102444800,
            email: Some("federated@example.com".to_string()),
            email_verified: Some(true),
            email_confirmed_at: None,
            user_metadata: Some(FederatedUserMetadata {
                full_name: Some("Fede Rated".to_string()),
            }),
        }
    }

    #[test]
    fn federated_identity_from_claims() {
        let identity: FederatedIdentity = sample_claims().into();
        assert_eq!(
            identity.subject,
            Uuid::parse_str("7a5f1b2e-9c43-4f7a-8d21-0c3e5a6b7d8f").unwrap()
        );
        assert_eq!(identity.email.as_deref(), Some("federated@example.com"));
        assert_eq!(identity.full_name.as_deref(), Some("Fede Rated"));
        assert!(identity.email_verified);
    }

    #[test]
    fn email_confirmed_at_counts_as_verified() {
        let mut claims = sample_claims();
        claims.email_verified = None;
        claims.email_confirmed_at = Some("2024-01-01T00:00:00Z".to_string());
        assert!(claims.email_is_verified());
    }

    #[test]
    fn no_verification_claim_means_unverified() {
        let mut claims = sample_claims();
        claims.email_verified = None;
        claims.email_confirmed_at = None;
        assert!(!claims.email_is_verified());
    }

    #[test]
    fn access_claims_tolerate_missing_issuer_and_audience() {
        let parsed: AccessTokenClaims =
            serde_json::from_str(r#"{"sub":"42","exp":4102444800}"#).unwrap();
        assert_eq!(parsed.sub, "42");
        assert!(parsed.iss.is_none());
        assert!(parsed.aud.is_none());
    }

    #[test]
    fn anonymous_identity_has_no_user_id() {
        assert!(Identity::Anonymous.is_anonymous());
        assert_eq!(Identity::Anonymous.user_id(), None);
    }
}
