// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderName;
use axum::response::AppendHeaders;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::cookies::clear_session_cookies;
use crate::auth::{Auth, FederatedIdentity, Identity};
use crate::error::ApiError;
use crate::models::{MessageResponse, UserProfile};
use crate::session::refresh;
use crate::state::AppState;

/// Response for GET /v1/users/me; shape depends on the identity scheme.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum MeResponse {
    User(UserProfile),
    Federated(FederatedIdentity),
}

/// Get the current authenticated identity.
///
/// First-party users are read back from the store so the response
/// reflects changes (verification, name) made after the token was
/// issued. Federated identities come straight from verified claims.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<MeResponse>, ApiError> {
    match identity {
        Identity::User(user) => {
            let store = state.store.read().await;
            let row = store
                .get_user(user.user_id)
                .filter(|u| !u.is_deleted())
                .ok_or_else(|| ApiError::not_found("User not found"))?;
            Ok(Json(MeResponse::User(UserProfile::from(row))))
        }
        Identity::Federated(federated) => Ok(Json(MeResponse::Federated(federated))),
        Identity::Anonymous => Err(ApiError::new(
            axum::http::StatusCode::UNAUTHORIZED,
            "Authentication is required",
        )),
    }
}

/// Delete (anonymize) the current account.
///
/// Soft deletion: the row is anonymized in place, the email is freed,
/// and every session credential is revoked.
#[utoipa::path(
    delete,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Federated identities have no local account"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn delete_current_user(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<
    (
        AppendHeaders<[(HeaderName, String); 2]>,
        Json<MessageResponse>,
    ),
    ApiError,
> {
    let Identity::User(user) = identity else {
        return Err(ApiError::bad_request(
            "No local account for this identity.",
        ));
    };

    {
        let mut store = state.store.write().await;
        refresh::revoke_all(&mut store, user.user_id);
        store.soft_delete_user(user.user_id, Utc::now());
    }

    info!(user_id = user.user_id, "account soft-deleted");
    let [access, refresh] = clear_session_cookies();
    Ok((
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(MessageResponse::new("Account deleted.")),
    ))
}
