// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! First-party access token encoding and verification (HS256).
//!
//! ## Security
//!
//! - Tokens are signed with a server-side symmetric secret (>= 32 bytes,
//!   enforced at config load, not here)
//! - Verification checks signature and expiry; issuer/audience are checked
//!   manually to preserve the backward-compat rule below
//! - `verify` never panics; every failure maps to a named [`AuthError`]
//!
//! ## Issuer/audience backward compatibility
//!
//! Tokens minted before the `iss`/`aud` claims were introduced carry
//! neither. A token with *no* issuer/audience claim is accepted; a token
//! with a *wrong* issuer/audience is always rejected. Collapsing these two
//! cases (e.g. by requiring the claims) would break old sessions; relaxing
//! the wrong-value case would reopen a cross-service token bypass.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::AccessTokenClaims;
use super::error::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Stateless encoder/verifier for first-party access tokens.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    /// Create a codec from the server secret.
    ///
    /// The secret length is validated by [`crate::config::AuthSettings`];
    /// a short secret never reaches this constructor.
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Issue a signed access token for `subject` expiring after `ttl`.
    pub fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            iss: Some(self.issuer.clone()),
            aud: Some(self.audience.clone()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to encode access token: {e}")))
    }

    /// Verify a first-party token and return its claims.
    ///
    /// Checks signature and expiry via the JWT library, then applies the
    /// manual issuer/audience rules described in the module docs.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        // iss/aud are compared manually below so that absent claims pass.
        validation.validate_aud = false;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::BadSignature,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::NotYetValid,
                _ => AuthError::Malformed,
            })?;

        let claims = token_data.claims;

        if let Some(iss) = &claims.iss {
            if iss != &self.issuer {
                return Err(AuthError::WrongIssuer);
            }
        }
        if let Some(aud) = &claims.aud {
            if aud != &self.audience {
                return Err(AuthError::WrongAudience);
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(TEST_SECRET, "marketplace-api", "marketplace")
    }

    /// Sign arbitrary claims with the test secret, bypassing `issue`.
    fn sign_raw(claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap()
    }

    #[test]
    fn issue_verify_round_trip() {
        let codec = codec();
        let token = codec.issue("42", Duration::minutes(15), Utc::now()).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss.as_deref(), Some("marketplace-api"));
        assert_eq!(claims.aud.as_deref(), Some("marketplace"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let token = codec
            .issue("42", Duration::minutes(15), Utc::now() - Duration::hours(2))
            .unwrap();

        assert!(matches!(codec.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let codec = codec();
        let other = TokenCodec::new(
            b"another-secret-another-secret-32",
            "marketplace-api",
            "marketplace",
        );
        let token = other.issue("42", Duration::minutes(15), Utc::now()).unwrap();

        assert!(matches!(codec.verify(&token), Err(AuthError::BadSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            codec().verify("not-a-jwt"),
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn missing_issuer_and_audience_accepted() {
        // Legacy token shape: signature and exp only.
        let token = sign_raw(&serde_json::json!({"sub": "7", "exp": 4102444800i64}));
        let claims = codec().verify(&token).unwrap();
        assert_eq!(claims.sub, "7");
    }

    #[test]
    fn wrong_issuer_rejected() {
        let token = sign_raw(&serde_json::json!({
            "sub": "7", "exp": 4102444800i64, "iss": "someone-else"
        }));
        assert!(matches!(codec().verify(&token), Err(AuthError::WrongIssuer)));
    }

    #[test]
    fn wrong_audience_rejected() {
        let token = sign_raw(&serde_json::json!({
            "sub": "7", "exp": 4102444800i64,
            "iss": "marketplace-api", "aud": "other-app"
        }));
        assert!(matches!(
            codec().verify(&token),
            Err(AuthError::WrongAudience)
        ));
    }
}
