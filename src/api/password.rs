// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password recovery and email verification endpoints.
//!
//! The request endpoints answer 202 with identical bodies whether or not
//! the email maps to an account; only the logs know the difference.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use super::auth::deliver_one_time_token;
use crate::auth::{Auth, Identity};
use crate::error::ApiError;
use crate::models::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyEmailRequest,
};
use crate::session::password::{hash_password, validate_password};
use crate::session::{refresh, reset};
use crate::state::AppState;
use crate::store::OneTimeTokenKind;

/// Request a password reset token.
#[utoipa::path(
    post,
    path = "/v1/auth/password/forgot",
    tag = "Password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 202, description = "Accepted; a reset link is sent if the email is registered", body = MessageResponse),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let now = Utc::now();
    {
        let mut store = state.store.write().await;
        if let Some(token) =
            reset::request(&mut store, &body.email, OneTimeTokenKind::PasswordReset, now)
        {
            deliver_one_time_token(&body.email, "password reset", &token);
        }
    }

    (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If that email is registered, a reset link has been sent.",
        )),
    )
}

/// Redeem a reset token and set a new password.
///
/// Every refresh token of the account is revoked: a reset is the
/// recovery path from a compromised credential, so surviving sessions
/// would defeat it. The lockout state clears for the same reason.
#[utoipa::path(
    post,
    path = "/v1/auth/password/reset",
    tag = "Password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated, all sessions revoked", body = MessageResponse),
        (status = 400, description = "Invalid token or weak password"),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password(&body.new_password).map_err(ApiError::from)?;
    let password_hash = hash_password(&body.new_password).map_err(ApiError::from)?;

    let now = Utc::now();
    let mut store = state.store.write().await;

    let user_id = reset::redeem(&mut store, &body.token, OneTimeTokenKind::PasswordReset, now)
        .map_err(ApiError::from)?;

    store.update_password(user_id, &password_hash).map_err(|e| {
        tracing::error!(error = %e, "password update failed after redemption");
        ApiError::internal("Internal error")
    })?;
    refresh::revoke_all(&mut store, user_id);
    if let Some(user) = store.get_user_mut(user_id) {
        user.failed_login_count = 0;
        user.locked_until = None;
    }

    info!(user_id, "password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset.")))
}

/// Redeem an email verification token.
#[utoipa::path(
    post,
    path = "/v1/auth/email/verify",
    tag = "Email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let now = Utc::now();
    let mut store = state.store.write().await;

    let user_id = reset::redeem(
        &mut store,
        &body.token,
        OneTimeTokenKind::EmailVerification,
        now,
    )
    .map_err(ApiError::from)?;

    store.mark_email_verified(user_id).map_err(|e| {
        tracing::error!(error = %e, "verification update failed after redemption");
        ApiError::internal("Internal error")
    })?;

    info!(user_id, "email verified");
    Ok(Json(MessageResponse::new("Email verified.")))
}

/// Request a fresh verification token for the authenticated account.
///
/// Answers 202 whether or not a token was minted (already verified,
/// federated identity, or issuance cap hit).
#[utoipa::path(
    post,
    path = "/v1/auth/email/resend",
    tag = "Email",
    security(("bearer" = [])),
    responses(
        (status = 202, description = "Accepted; a verification link is sent if applicable", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> (StatusCode, Json<MessageResponse>) {
    let now = Utc::now();
    if let Identity::User(user) = identity {
        if !user.email_verified {
            let mut store = state.store.write().await;
            if let Some(token) = reset::request(
                &mut store,
                &user.email,
                OneTimeTokenKind::EmailVerification,
                now,
            ) {
                deliver_one_time_token(&user.email, "email verification", &token);
            }
        }
    }

    (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "If the email needs verification, a link has been sent.",
        )),
    )
}
