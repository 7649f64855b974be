// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Covers both first-party (HS256) and federated (JWKS) verification.
/// None of these variants escape [`crate::auth::AuthGateway::resolve`];
/// they are logged with their specific kind and collapse to an anonymous
/// identity. The `Auth` extractor surfaces them as HTTP rejections.
#[derive(Debug)]
pub enum AuthError {
    /// No credential present (no Authorization header, no cookie)
    MissingCredential,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Credential present but did not verify (generic external form)
    InvalidCredential,
    /// Token is malformed
    Malformed,
    /// Token signature is invalid
    BadSignature,
    /// Token has expired
    Expired,
    /// Token is not yet valid
    NotYetValid,
    /// Token issuer does not match the configured issuer
    WrongIssuer,
    /// Token audience does not match the configured audience
    WrongAudience,
    /// Token `kid` has no matching key in the JWKS
    UnknownKey,
    /// Token algorithm is not an accepted asymmetric algorithm
    UnsupportedAlgorithm,
    /// JWKS unreachable and no usable cache
    Unavailable(String),
    /// Internal error (key construction, encoding)
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Stable machine-readable kind, used for logging and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::Malformed => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "token_expired",
            AuthError::NotYetValid => "token_not_yet_valid",
            AuthError::WrongIssuer => "wrong_issuer",
            AuthError::WrongAudience => "wrong_audience",
            AuthError::UnknownKey => "unknown_key",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::Unavailable(_) => "keys_unavailable",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidCredential
            | AuthError::Malformed
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::NotYetValid
            | AuthError::WrongIssuer
            | AuthError::WrongAudience
            | AuthError::UnknownKey
            | AuthError::UnsupportedAlgorithm => StatusCode::UNAUTHORIZED,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Authentication is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidCredential => write!(f, "Invalid or expired credential"),
            AuthError::Malformed => write!(f, "Token is malformed"),
            AuthError::BadSignature => write!(f, "Token signature is invalid"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::NotYetValid => write!(f, "Token is not yet valid"),
            AuthError::WrongIssuer => write!(f, "Token issuer is invalid"),
            AuthError::WrongAudience => write!(f, "Token audience is invalid"),
            AuthError::UnknownKey => write!(f, "No matching key found in JWKS"),
            AuthError::UnsupportedAlgorithm => write!(f, "Token algorithm is not supported"),
            AuthError::Unavailable(msg) => {
                write!(f, "Identity provider keys unavailable: {msg}")
            }
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Verification details stay internal; the body carries the generic form.
        let external = match &self {
            AuthError::MissingCredential => AuthError::MissingCredential,
            AuthError::InvalidAuthHeader => AuthError::InvalidAuthHeader,
            AuthError::Unavailable(_) => AuthError::Unavailable("try again later".to_string()),
            _ => AuthError::InvalidCredential,
        };
        let body = Json(AuthErrorBody {
            error: external.to_string(),
            error_code: external.kind().to_string(),
        });
        (status, body).into_response()
    }
}
