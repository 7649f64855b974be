// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token issuance, rotation, and revocation.
//!
//! Refresh tokens are opaque 32-byte secrets; only their SHA-256 digest
//! is stored. Rotation is check-delete-insert under the store's write
//! lock, so a rotated token can never redeem twice: the second caller
//! misses the digest and gets [`SessionError::InvalidToken`].

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::{generate_opaque_token, token_digest, SessionError};
use crate::store::InMemoryStore;

/// Issue a fresh refresh token for a user. Returns the raw secret; the
/// store only ever sees its digest. `issued_from` is forensic metadata
/// (client address), not part of validity.
pub fn issue(
    store: &mut InMemoryStore,
    user_id: i64,
    ttl: Duration,
    issued_from: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let token = generate_opaque_token();
    store.insert_refresh_token(&token_digest(&token), user_id, now + ttl, issued_from, now);
    token
}

/// Rotate a refresh token: consume the old one, mint a replacement.
///
/// Returns the new raw token and the owning user id. Unknown, replayed,
/// and expired tokens are all [`SessionError::InvalidToken`].
pub fn rotate(
    store: &mut InMemoryStore,
    token: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<(String, i64), SessionError> {
    let record = store
        .take_refresh_token(&token_digest(token))
        .ok_or(SessionError::InvalidToken)?;

    if now >= record.expires_at {
        return Err(SessionError::InvalidToken);
    }

    let user_still_live = store
        .get_user(record.user_id)
        .is_some_and(|u| !u.is_deleted());
    if !user_still_live {
        return Err(SessionError::InvalidToken);
    }

    // The issue-time address survives rotation.
    let new_token = issue(
        store,
        record.user_id,
        ttl,
        record.issued_from.as_deref(),
        now,
    );
    Ok((new_token, record.user_id))
}

/// Revoke a single refresh token (logout). Unknown tokens are a no-op;
/// logout is idempotent.
pub fn revoke(store: &mut InMemoryStore, token: &str) {
    store.take_refresh_token(&token_digest(token));
}

/// Revoke every refresh token of a user (logout-all, password reset).
pub fn revoke_all(store: &mut InMemoryStore, user_id: i64) -> usize {
    let revoked = store.revoke_refresh_tokens(user_id);
    if revoked > 0 {
        info!(user_id, revoked, "revoked all refresh tokens");
    }
    revoked
}
