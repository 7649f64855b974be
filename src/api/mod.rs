// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest,
        ResetPasswordRequest, Role, TokenPairResponse, UserProfile, VerifyEmailRequest,
    },
    state::AppState,
};

pub mod auth;
pub mod cookies;
pub mod health;
pub mod password;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_session))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/password/forgot", post(password::forgot_password))
        .route("/auth/password/reset", post(password::reset_password))
        .route("/auth/email/verify", post(password::verify_email))
        .route("/auth/email/resend", post(password::resend_verification))
        .route(
            "/users/me",
            get(users::get_current_user).delete(users::delete_current_user),
        )
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::refresh_session,
        auth::logout,
        auth::logout_all,
        password::forgot_password,
        password::reset_password,
        password::verify_email,
        password::resend_verification,
        users::get_current_user,
        users::delete_current_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            VerifyEmailRequest,
            TokenPairResponse,
            MessageResponse,
            UserProfile,
            Role,
            users::MeResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration and session lifecycle"),
        (name = "Password", description = "Password recovery"),
        (name = "Email", description = "Email verification"),
        (name = "Users", description = "Account management"),
        (name = "Health", description = "Probes")
    )
)]
struct ApiDoc;
