// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing, verification, and input normalization.
//!
//! ## Security
//!
//! - Argon2id with the library's current default parameters; the PHC
//!   string records them, so parameter upgrades only affect new hashes
//! - Passwords are NFKC-normalized before hashing so the same visual
//!   input verifies regardless of how the client composed it
//! - `verify_password` returns a plain bool; callers must not branch on
//!   hash-parse failures differently from mismatches

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use unicode_normalization::UnicodeNormalization;

use super::SessionError;

const MIN_PASSWORD_CHARS: usize = 8;
/// Upper bound keeps Argon2 input small and rejects paste accidents.
const MAX_PASSWORD_CHARS: usize = 128;

/// Normalize an email address for storage and lookup: NFKC, trimmed,
/// lowercased. Lookup and storage must agree on the form or a user who
/// registered via a composing keyboard can never log in.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Minimal shape check. Not an RFC validator; the store's uniqueness
/// check and the verification flow carry the real guarantees.
pub fn validate_email(email: &str) -> Result<(), SessionError> {
    let email = email.trim();
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::Validation("Invalid email address.".to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), SessionError> {
    let chars = password.chars().count();
    if chars < MIN_PASSWORD_CHARS {
        return Err(SessionError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters."
        )));
    }
    if chars > MAX_PASSWORD_CHARS {
        return Err(SessionError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_CHARS} characters."
        )));
    }
    Ok(())
}

fn normalize_password(password: &str) -> String {
    password.nfkc().collect()
}

/// Hash a password to an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, SessionError> {
    let normalized = normalize_password(password);
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(normalized.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SessionError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        // Cleared hash (soft-deleted account) or corrupt row.
        return false;
    };
    let normalized = normalize_password(password);
    Argon2::default()
        .verify_password(normalized.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
    }

    #[test]
    fn nfkc_equivalent_inputs_verify() {
        // U+212B ANGSTROM SIGN normalizes to U+00C5.
        let hash = hash_password("pass\u{212B}word").unwrap();
        assert!(verify_password("pass\u{00C5}word", &hash));
    }

    #[test]
    fn empty_stored_hash_never_verifies() {
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
        // Length is counted in characters, not bytes.
        assert!(validate_password("pässwörd").is_ok());
    }

    #[test]
    fn email_normalization_and_shape() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }
}
