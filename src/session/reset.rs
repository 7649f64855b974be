// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time tokens: password reset and email verification.
//!
//! Both kinds share the opaque-secret/digest scheme of refresh tokens
//! but redeem exactly once and for exactly one purpose. Request paths
//! are silent about account existence: the caller gets the same outcome
//! whether or not the email maps to a user.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::password::normalize_email;
use super::{generate_opaque_token, token_digest, SessionError};
use crate::store::{InMemoryStore, OneTimeTokenKind};

/// Password reset tokens live for one hour.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Email verification tokens live for a day.
pub const VERIFICATION_TOKEN_TTL: Duration = Duration::hours(24);

/// At most this many tokens of one kind may be minted per user per hour.
const ISSUANCE_CAP_PER_HOUR: usize = 3;

fn kind_ttl(kind: OneTimeTokenKind) -> Duration {
    match kind {
        OneTimeTokenKind::PasswordReset => RESET_TOKEN_TTL,
        OneTimeTokenKind::EmailVerification => VERIFICATION_TOKEN_TTL,
    }
}

/// Mint a one-time token for the account behind `email`.
///
/// Returns `None` when the email is unknown, the account is deleted, or
/// the issuance cap is hit. Callers respond identically in every case;
/// only the logs know which it was.
pub fn request(
    store: &mut InMemoryStore,
    email: &str,
    kind: OneTimeTokenKind,
    now: DateTime<Utc>,
) -> Option<String> {
    let email = normalize_email(email);
    let Some(user) = store.get_user_by_email(&email) else {
        info!("one-time token requested for unknown email");
        return None;
    };
    let user_id = user.id;

    let recent = store.count_recent_one_time_tokens(user_id, kind, now - Duration::hours(1));
    if recent >= ISSUANCE_CAP_PER_HOUR {
        info!(user_id, "one-time token refused: issuance cap");
        return None;
    }

    let token = generate_opaque_token();
    store.insert_one_time_token(&token_digest(&token), user_id, kind, now + kind_ttl(kind), now);
    Some(token)
}

/// Redeem a one-time token, consuming it. Returns the owning user id.
pub fn redeem(
    store: &mut InMemoryStore,
    token: &str,
    kind: OneTimeTokenKind,
    now: DateTime<Utc>,
) -> Result<i64, SessionError> {
    let record = store
        .take_one_time_token(&token_digest(token), kind, now)
        .ok_or(SessionError::InvalidToken)?;

    let user_live = store
        .get_user(record.user_id)
        .is_some_and(|u| !u.is_deleted());
    if !user_live {
        return Err(SessionError::InvalidToken);
    }

    Ok(record.user_id)
}
