// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.
//!
//! Backs users, refresh tokens, one-time tokens, and the login-attempt
//! log. Shared as `Arc<RwLock<InMemoryStore>>`; multi-step operations
//! that must be atomic (refresh rotation, one-time token redemption)
//! hold the write lock across the whole check-delete-insert sequence.
//!
//! ## Security
//!
//! - Refresh and one-time tokens are stored by SHA-256 digest only; the
//!   raw secret exists nowhere but the client
//! - Soft deletion anonymizes the row in place so that historical ids
//!   stay referentially valid while the credential is destroyed

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{Role, User};

/// How long login attempts are retained (covers the daily IP window).
const ATTEMPT_RETENTION: Duration = Duration::hours(24);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("no such user")]
    UnknownUser,
}

/// What a one-time token is good for. A token minted for one purpose
/// never redeems for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneTimeTokenKind {
    PasswordReset,
    EmailVerification,
}

/// A stored refresh token (digest-keyed).
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Client address at issue time, carried across rotations. Forensic
    /// metadata only; never part of a validity decision.
    pub issued_from: Option<String>,
}

/// A stored one-time token (digest-keyed).
#[derive(Debug, Clone)]
pub struct OneTimeTokenRecord {
    pub user_id: i64,
    pub kind: OneTimeTokenKind,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One row in the login-attempt log.
#[derive(Debug, Clone)]
struct LoginAttempt {
    email: String,
    ip: String,
    at: DateTime<Utc>,
    success: bool,
}

/// All mutable authentication state.
#[derive(Default)]
pub struct InMemoryStore {
    users: HashMap<i64, User>,
    email_index: HashMap<String, i64>,
    next_user_id: i64,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    one_time_tokens: HashMap<String, OneTimeTokenRecord>,
    login_attempts: Vec<LoginAttempt>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            next_user_id: 1,
            ..Default::default()
        }
    }

    // ---- Users ----

    /// Create a user. The email must already be normalized.
    pub fn create_user(
        &mut self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        if self.email_index.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }

        let id = self.next_user_id;
        self.next_user_id += 1;

        let user = User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.map(str::to_string),
            role: Role::User,
            email_verified: false,
            created_at: now,
            deleted_at: None,
            failed_login_count: 0,
            locked_until: None,
        };

        self.email_index.insert(email.to_string(), id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn get_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    pub(crate) fn get_user_mut(&mut self, id: i64) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    /// Look up a live (non-deleted) user by normalized email.
    pub fn get_user_by_email(&self, email: &str) -> Option<&User> {
        let id = self.email_index.get(email)?;
        self.users.get(id).filter(|u| !u.is_deleted())
    }

    pub fn update_password(&mut self, user_id: i64, hash: &str) -> Result<(), StoreError> {
        let user = self.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;
        user.password_hash = hash.to_string();
        Ok(())
    }

    pub fn mark_email_verified(&mut self, user_id: i64) -> Result<(), StoreError> {
        let user = self.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;
        user.email_verified = true;
        Ok(())
    }

    /// Soft-delete: anonymize the row, free the email for re-registration,
    /// and revoke every credential attached to the account.
    pub fn soft_delete_user(&mut self, user_id: i64, now: DateTime<Utc>) {
        if let Some(user) = self.users.get_mut(&user_id) {
            self.email_index.remove(&user.email);
            user.email = format!("deleted-{user_id}@redacted.invalid");
            user.full_name = None;
            user.password_hash.clear();
            user.deleted_at = Some(now);
        }
        self.refresh_tokens.retain(|_, r| r.user_id != user_id);
        self.one_time_tokens.retain(|_, r| r.user_id != user_id);
    }

    // ---- Refresh tokens ----

    pub fn insert_refresh_token(
        &mut self,
        digest: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
        issued_from: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.refresh_tokens.insert(
            digest.to_string(),
            RefreshTokenRecord {
                user_id,
                expires_at,
                created_at: now,
                issued_from: issued_from.map(str::to_string),
            },
        );
    }

    /// Remove and return a refresh token by digest.
    ///
    /// This is the anti-replay primitive: the first caller gets the
    /// record, everyone after gets `None`.
    pub fn take_refresh_token(&mut self, digest: &str) -> Option<RefreshTokenRecord> {
        self.refresh_tokens.remove(digest)
    }

    /// Revoke every refresh token of a user. Returns how many existed.
    pub fn revoke_refresh_tokens(&mut self, user_id: i64) -> usize {
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|_, r| r.user_id != user_id);
        before - self.refresh_tokens.len()
    }

    // ---- One-time tokens ----

    pub fn insert_one_time_token(
        &mut self,
        digest: &str,
        user_id: i64,
        kind: OneTimeTokenKind,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.one_time_tokens.insert(
            digest.to_string(),
            OneTimeTokenRecord {
                user_id,
                kind,
                expires_at,
                created_at: now,
            },
        );
    }

    /// Redeem a one-time token: remove it and return the record when the
    /// digest exists, the kind matches, and it has not expired.
    ///
    /// An expired or kind-mismatched token is removed without being
    /// returned; it was spent either way.
    pub fn take_one_time_token(
        &mut self,
        digest: &str,
        kind: OneTimeTokenKind,
        now: DateTime<Utc>,
    ) -> Option<OneTimeTokenRecord> {
        let record = self.one_time_tokens.remove(digest)?;
        (record.kind == kind && now < record.expires_at).then_some(record)
    }

    /// Outstanding one-time tokens of a kind minted for a user since
    /// `since`. Backs the issuance cap on password resets.
    pub fn count_recent_one_time_tokens(
        &self,
        user_id: i64,
        kind: OneTimeTokenKind,
        since: DateTime<Utc>,
    ) -> usize {
        self.one_time_tokens
            .values()
            .filter(|r| r.user_id == user_id && r.kind == kind && r.created_at >= since)
            .count()
    }

    // ---- Login attempts ----

    /// Record a login attempt and prune entries past the retention window.
    pub fn record_login_attempt(
        &mut self,
        email: &str,
        ip: &str,
        success: bool,
        now: DateTime<Utc>,
    ) {
        let horizon = now - ATTEMPT_RETENTION;
        self.login_attempts.retain(|a| a.at > horizon);
        self.login_attempts.push(LoginAttempt {
            email: email.to_string(),
            ip: ip.to_string(),
            at: now,
            success,
        });
    }

    /// Failed attempts against an email since `since`.
    pub fn failed_attempts_for_email(&self, email: &str, since: DateTime<Utc>) -> usize {
        self.login_attempts
            .iter()
            .filter(|a| !a.success && a.email == email && a.at >= since)
            .count()
    }

    /// Attempts from an IP since `since`, successes included.
    pub fn attempts_for_ip(&self, ip: &str, since: DateTime<Utc>) -> usize {
        self.login_attempts
            .iter()
            .filter(|a| a.ip == ip && a.at >= since)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn duplicate_email_rejected() {
        let mut store = InMemoryStore::new();
        store.create_user("a@example.com", "h", None, now()).unwrap();
        assert!(matches!(
            store.create_user("a@example.com", "h2", None, now()),
            Err(StoreError::DuplicateEmail)
        ));
    }

    #[test]
    fn soft_delete_anonymizes_and_frees_the_email() {
        let mut store = InMemoryStore::new();
        let user = store
            .create_user("gone@example.com", "h", Some("Gone Person"), now())
            .unwrap();
        store.insert_refresh_token("d1", user.id, now() + Duration::days(7), None, now());

        store.soft_delete_user(user.id, now());

        let row = store.get_user(user.id).unwrap();
        assert!(row.is_deleted());
        assert!(row.password_hash.is_empty());
        assert!(row.full_name.is_none());
        assert!(!row.email.contains("gone@example.com"));

        // Email can be registered again, lookups by the old email miss.
        assert!(store.get_user_by_email("gone@example.com").is_none());
        assert!(store.create_user("gone@example.com", "h", None, now()).is_ok());

        // Attached credentials are gone.
        assert!(store.take_refresh_token("d1").is_none());
    }

    #[test]
    fn refresh_token_single_take() {
        let mut store = InMemoryStore::new();
        store.insert_refresh_token("digest", 1, now() + Duration::days(7), None, now());

        assert!(store.take_refresh_token("digest").is_some());
        assert!(store.take_refresh_token("digest").is_none());
    }

    #[test]
    fn revoke_all_counts_only_the_users_tokens() {
        let mut store = InMemoryStore::new();
        store.insert_refresh_token("a", 1, now() + Duration::days(7), None, now());
        store.insert_refresh_token("b", 1, now() + Duration::days(7), None, now());
        store.insert_refresh_token("c", 2, now() + Duration::days(7), None, now());

        assert_eq!(store.revoke_refresh_tokens(1), 2);
        assert!(store.take_refresh_token("c").is_some());
    }

    #[test]
    fn one_time_token_kind_must_match() {
        let mut store = InMemoryStore::new();
        store.insert_one_time_token(
            "d",
            1,
            OneTimeTokenKind::EmailVerification,
            now() + Duration::hours(24),
            now(),
        );

        // Wrong kind spends the token without redeeming it.
        assert!(store
            .take_one_time_token("d", OneTimeTokenKind::PasswordReset, now())
            .is_none());
        assert!(store
            .take_one_time_token("d", OneTimeTokenKind::EmailVerification, now())
            .is_none());
    }

    #[test]
    fn expired_one_time_token_is_spent_not_redeemed() {
        let mut store = InMemoryStore::new();
        let t = now();
        store.insert_one_time_token("d", 1, OneTimeTokenKind::PasswordReset, t, t);

        assert!(store
            .take_one_time_token("d", OneTimeTokenKind::PasswordReset, t + Duration::seconds(1))
            .is_none());
    }

    #[test]
    fn attempt_log_windows_by_email_and_ip() {
        let mut store = InMemoryStore::new();
        let t = now();
        store.record_login_attempt("a@example.com", "10.0.0.1", false, t);
        store.record_login_attempt("a@example.com", "10.0.0.2", false, t);
        store.record_login_attempt("b@example.com", "10.0.0.1", true, t);

        assert_eq!(
            store.failed_attempts_for_email("a@example.com", t - Duration::minutes(15)),
            2
        );
        // Successes stay out of the email window but do count toward
        // the per-IP total.
        assert_eq!(
            store.failed_attempts_for_email("b@example.com", t - Duration::minutes(15)),
            0
        );
        assert_eq!(store.attempts_for_ip("10.0.0.1", t - Duration::hours(24)), 2);
        // Outside the window.
        assert_eq!(
            store.failed_attempts_for_email("a@example.com", t + Duration::seconds(1)),
            0
        );
    }
}
