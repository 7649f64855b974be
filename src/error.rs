// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::session::SessionError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<SessionError> for ApiError {
    /// Map session failures to HTTP, keeping the generic messages.
    ///
    /// Lockout and rate limiting share a status on purpose; a client must
    /// not be able to tell which throttle it hit.
    fn from(e: SessionError) -> Self {
        let status = match &e {
            SessionError::RateLimited | SessionError::Locked => StatusCode::TOO_MANY_REQUESTS,
            SessionError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            SessionError::InvalidToken => StatusCode::BAD_REQUEST,
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::Internal(msg) => {
                tracing::error!(detail = %msg, "session-layer internal error");
                return Self::internal("Internal error");
            }
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
