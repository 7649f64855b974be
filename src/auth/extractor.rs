// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated handlers.
//!
//! [`Auth`] rejects the request when no valid credential is present;
//! [`OptionalAuth`] always succeeds and hands the handler an [`Identity`]
//! that may be anonymous. Both read the bearer token from the
//! `Authorization` header first, falling back to the `access_token`
//! cookie for browser clients.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;

use super::claims::Identity;
use super::error::AuthError;
use crate::api::cookies::ACCESS_COOKIE;
use crate::state::AppState;

/// Require an authenticated identity.
///
/// Rejections: 401 for missing/invalid credentials, 503 when the
/// identity provider's keys are unreachable (the client's token may be
/// perfectly fine; blaming it would trigger needless re-logins).
pub struct Auth(pub Identity);

/// Resolve an identity if a credential is present, anonymous otherwise.
///
/// Never rejects. Handlers that merely personalize output use this.
pub struct OptionalAuth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts)?.ok_or(AuthError::MissingCredential)?;

        match state.gateway.authenticate(&token).await {
            Ok(Identity::Anonymous) => Err(AuthError::InvalidCredential),
            Ok(identity) => Ok(Auth(identity)),
            Err(e @ AuthError::Unavailable(_)) => Err(e),
            Err(e) => {
                tracing::debug!(kind = e.kind(), "request credential rejected");
                Err(AuthError::InvalidCredential)
            }
        }
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let identity = match bearer_token(parts) {
            Ok(Some(token)) => state.gateway.resolve(&token).await,
            // Absent or malformed header both degrade to anonymous here.
            Ok(None) | Err(_) => Identity::Anonymous,
        };
        Ok(OptionalAuth(identity))
    }
}

/// Pull the bearer token out of the request.
///
/// `Ok(None)` means no credential was offered at all; a present but
/// malformed `Authorization` header is an error, not an absence.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;
        if token.is_empty() {
            return Err(AuthError::InvalidAuthHeader);
        }
        return Ok(Some(token.to_string()));
    }

    Ok(cookie_value(parts, ACCESS_COOKIE))
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then(|| v.to_string())
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: &'static str, value: &str) -> Parts {
        let request = Request::builder()
            .uri("/")
            .header(header, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn bearer_header_wins() {
        let parts = parts_with("authorization", "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts).unwrap().as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn malformed_header_is_an_error_not_an_absence() {
        let parts = parts_with("authorization", "Token abc");
        assert!(matches!(
            bearer_token(&parts),
            Err(AuthError::InvalidAuthHeader)
        ));

        let parts = parts_with("authorization", "Bearer ");
        assert!(matches!(
            bearer_token(&parts),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn cookie_fallback() {
        let parts = parts_with("cookie", "theme=dark; access_token=tok123; lang=en");
        assert_eq!(bearer_token(&parts).unwrap().as_deref(), Some("tok123"));
    }

    #[test]
    fn header_takes_precedence_over_cookie() {
        let request = Request::builder()
            .uri("/")
            .header("authorization", "Bearer from-header")
            .header("cookie", "access_token=from-cookie")
            .body(())
            .unwrap();
        let parts = request.into_parts().0;
        assert_eq!(
            bearer_token(&parts).unwrap().as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn no_credential_is_none() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let parts = request.into_parts().0;
        assert_eq!(bearer_token(&parts).unwrap(), None);
    }

    #[tokio::test]
    async fn optional_auth_is_anonymous_instead_of_rejecting() {
        let state = AppState::for_tests();

        let request = Request::builder().uri("/").body(()).unwrap();
        let mut parts = request.into_parts().0;
        let OptionalAuth(identity) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(identity.is_anonymous());

        // A garbage credential degrades the same way.
        let mut parts = parts_with("authorization", "Bearer not-a-jwt");
        let OptionalAuth(identity) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(identity.is_anonymous());
    }

    #[tokio::test]
    async fn optional_auth_resolves_a_live_user() {
        let state = AppState::for_tests();
        let now = chrono::Utc::now();
        let user_id = state
            .store
            .write()
            .await
            .create_user("opt@example.com", "hash", None, now)
            .unwrap()
            .id;
        let token = state
            .codec
            .issue(&user_id.to_string(), chrono::Duration::minutes(5), now)
            .unwrap();

        let mut parts = parts_with("authorization", &format!("Bearer {token}"));
        let OptionalAuth(identity) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(identity.user_id(), Some(user_id));
    }
}
