// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain models and API DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role attached to a first-party user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A first-party account row.
///
/// Never serialized to clients as-is; handlers map it to [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    /// Normalized (trimmed, lowercased) email
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    /// Soft-deletion marker; a set value means the account is gone
    pub deleted_at: Option<DateTime<Utc>>,
    /// Consecutive failed login count since the last success
    pub failed_login_count: u32,
    /// Lockout horizon; logins are refused until this passes
    pub locked_until: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

// ---- Request bodies ----

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Must be `true`; accounts cannot be created without accepting the
    /// terms of service.
    #[serde(default)]
    pub terms_accepted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh body; the token may instead arrive in the `refresh_token`
/// cookie, so the field is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub token: String,
}

// ---- Response bodies ----

/// Token pair returned by register, login, and refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            role: Role::User,
            email_verified: false,
            created_at: Utc::now(),
            deleted_at: None,
            failed_login_count: 0,
            locked_until: None,
        }
    }

    #[test]
    fn lock_horizon_is_exclusive_of_the_past() {
        let mut u = user();
        let now = Utc::now();
        assert!(!u.is_locked(now));

        u.locked_until = Some(now + chrono::Duration::minutes(30));
        assert!(u.is_locked(now));
        assert!(!u.is_locked(now + chrono::Duration::minutes(31)));
    }

    #[test]
    fn profile_never_carries_the_password_hash() {
        let profile = UserProfile::from(&user());
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@example.com");
    }
}
