// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace Auth - Authentication and Session Security Service
//!
//! Issues and verifies first-party HS256 access tokens, verifies
//! federated RS256/ES256 tokens against a provider JWKS, and manages
//! the full session lifecycle: refresh rotation, lockout and rate
//! limiting, password reset, and email verification.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification and identity resolution
//! - `session` - Passwords, lockout, refresh and one-time tokens
//! - `store` - In-memory credential store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
