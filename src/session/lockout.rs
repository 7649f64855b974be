// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login throttling: per-account lockout and windowed rate limits.
//!
//! Order of checks matters and is fixed:
//!
//! 1. per-IP daily limit (cheapest, widest)
//! 2. per-email 15-minute window
//! 3. account lockout horizon
//! 4. the actual password check
//!
//! The rate-limit checks run before any credential is touched, so an
//! attacker being throttled learns nothing about whether the email is
//! registered. Attempts refused by a rate limit are NOT recorded; a
//! throttled client hammering the endpoint must not extend its own
//! window indefinitely.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::password::{normalize_email, verify_password};
use super::SessionError;
use crate::models::User;
use crate::store::InMemoryStore;

/// Throttling policy. [`Default`] carries the production values.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Consecutive failures before the account locks
    pub max_consecutive_failures: u32,
    /// How long a locked account stays locked
    pub lock_duration: Duration,
    /// Failed attempts per email tolerated inside `window`
    pub window_max_failures: usize,
    /// Sliding window for the per-email limit
    pub window: Duration,
    /// Attempts per IP tolerated per day, successes included
    pub ip_daily_max: usize,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            lock_duration: Duration::minutes(30),
            window_max_failures: 5,
            window: Duration::minutes(15),
            ip_daily_max: 50,
        }
    }
}

/// Check a password credential under the throttling policy.
///
/// On success the failure counter and lockout horizon reset and a
/// success attempt is logged. Every failure path returns one of the
/// generic [`SessionError`] variants.
pub fn authenticate_password(
    store: &mut InMemoryStore,
    policy: &LockoutPolicy,
    email: &str,
    password: &str,
    ip: &str,
    now: DateTime<Utc>,
) -> Result<User, SessionError> {
    let email = normalize_email(email);

    if store.attempts_for_ip(ip, now - Duration::hours(24)) >= policy.ip_daily_max {
        info!(ip, "login refused: IP daily limit");
        return Err(SessionError::RateLimited);
    }
    if store.failed_attempts_for_email(&email, now - policy.window) >= policy.window_max_failures {
        info!("login refused: email window limit");
        return Err(SessionError::RateLimited);
    }

    let Some((user_id, locked, lock_elapsed, password_hash)) =
        store.get_user_by_email(&email).map(|u| {
            (
                u.id,
                u.is_locked(now),
                !u.is_locked(now) && u.locked_until.is_some(),
                u.password_hash.clone(),
            )
        })
    else {
        // Unknown email burns an attempt like a wrong password would.
        store.record_login_attempt(&email, ip, false, now);
        return Err(SessionError::InvalidCredentials);
    };

    if locked {
        store.record_login_attempt(&email, ip, false, now);
        info!(user_id, "login refused: account locked");
        return Err(SessionError::Locked);
    }

    if lock_elapsed {
        // A served lock wipes the slate; the next failure starts a fresh
        // count instead of re-locking immediately.
        let user = store
            .get_user_mut(user_id)
            .ok_or_else(|| SessionError::Internal("user vanished mid-login".to_string()))?;
        user.failed_login_count = 0;
        user.locked_until = None;
    }

    if !verify_password(password, &password_hash) {
        store.record_login_attempt(&email, ip, false, now);
        let user = store
            .get_user_mut(user_id)
            .ok_or_else(|| SessionError::Internal("user vanished mid-login".to_string()))?;
        user.failed_login_count += 1;
        if user.failed_login_count >= policy.max_consecutive_failures {
            user.locked_until = Some(now + policy.lock_duration);
            info!(user_id, "account locked after repeated failures");
        }
        return Err(SessionError::InvalidCredentials);
    }

    store.record_login_attempt(&email, ip, true, now);
    let user = store
        .get_user_mut(user_id)
        .ok_or_else(|| SessionError::Internal("user vanished mid-login".to_string()))?;
    user.failed_login_count = 0;
    user.locked_until = None;
    Ok(user.clone())
}
