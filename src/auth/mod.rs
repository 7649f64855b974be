// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification and identity resolution.
//!
//! Two token schemes coexist:
//!
//! - **First-party** access tokens: HS256, minted by this service,
//!   subjects resolved against the credential store
//! - **Federated** tokens: RS256/ES256, minted by the identity provider,
//!   verified against its JWKS, never backed by a local user row
//!
//! [`AuthGateway`] classifies and dispatches; the [`Auth`] and
//! [`OptionalAuth`] extractors expose the result to handlers.

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod federated;
pub mod gateway;
pub mod jwks;

pub use claims::{AccessTokenClaims, FederatedIdentity, Identity, UserIdentity};
pub use codec::TokenCodec;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use federated::FederatedTokenVerifier;
pub use gateway::AuthGateway;
pub use jwks::JwksClient;
