// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session lifecycle: password credentials, lockout, refresh rotation,
//! and one-time (reset/verification) tokens.
//!
//! Everything here operates on the store under an already-held write
//! lock, takes `now` explicitly, and returns [`SessionError`]; HTTP
//! concerns live in the API layer.

pub mod lockout;
pub mod password;
pub mod refresh;
pub mod reset;

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Session-layer failure.
///
/// User-facing messages are deliberately generic: they never reveal
/// whether an email is registered, which credential check failed, or
/// whether an account is locked as opposed to rate limited.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Too many failed attempts in the window (email or IP scoped)
    #[error("Too many attempts. Please try again later.")]
    RateLimited,
    /// Account is locked out
    #[error("Too many attempts. Please try again later.")]
    Locked,
    /// Unknown email, wrong password, or deleted account
    #[error("Invalid email or password.")]
    InvalidCredentials,
    /// Unknown, expired, replayed, or wrong-purpose token
    #[error("Invalid or expired token.")]
    InvalidToken,
    /// Request body failed validation; the message is safe to show
    #[error("{0}")]
    Validation(String),
    /// Hashing or storage failure
    #[error("Internal error")]
    Internal(String),
}

impl SessionError {
    /// Stable kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::RateLimited => "rate_limited",
            SessionError::Locked => "account_locked",
            SessionError::InvalidCredentials => "invalid_credentials",
            SessionError::InvalidToken => "invalid_token",
            SessionError::Validation(_) => "validation",
            SessionError::Internal(_) => "internal_error",
        }
    }
}

/// Generate an opaque session secret: 32 random bytes, base64url.
pub(crate) fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Digest under which an opaque token is stored.
pub(crate) fn token_digest(token: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_tokens_are_unique_and_url_safe() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43); // 32 bytes, unpadded base64
        assert!(!a.contains(['+', '/', '=']));
    }

    #[test]
    fn digest_is_stable_and_distinct_from_the_token() {
        let token = generate_opaque_token();
        assert_eq!(token_digest(&token), token_digest(&token));
        assert_ne!(token_digest(&token), token);
    }

    #[test]
    fn lockout_and_rate_limit_messages_are_indistinguishable() {
        assert_eq!(
            SessionError::RateLimited.to_string(),
            SessionError::Locked.to_string()
        );
    }
}
