// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie construction.
//!
//! Browser clients carry the token pair in cookies instead of storing it
//! in script-reachable storage. Both cookies are `HttpOnly`; the refresh
//! cookie is additionally path-scoped to the auth endpoints so it never
//! rides along on ordinary API calls.

/// Access token cookie, read by the auth extractor.
pub const ACCESS_COOKIE: &str = "access_token";

/// Refresh token cookie, read by the refresh/logout handlers.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Path the refresh cookie is scoped to.
const REFRESH_PATH: &str = "/v1/auth";

/// Attributes shared by every session cookie. `Secure` would make a
/// plain-HTTP dev server's cookies vanish silently, so dev builds drop
/// it; production builds always carry it.
const COOKIE_ATTRIBUTES: &str = if cfg!(feature = "dev") {
    "HttpOnly; SameSite=Lax"
} else {
    "HttpOnly; Secure; SameSite=Lax"
};

/// Build a session cookie.
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64, path: &str) -> String {
    format!("{name}={value}; Max-Age={max_age_secs}; Path={path}; {COOKIE_ATTRIBUTES}")
}

/// The `Set-Cookie` pair installing both session cookies.
pub fn set_session_cookies(
    access_token: &str,
    access_max_age_secs: i64,
    refresh_token: &str,
    refresh_max_age_secs: i64,
) -> [String; 2] {
    [
        session_cookie(ACCESS_COOKIE, access_token, access_max_age_secs, "/"),
        session_cookie(
            REFRESH_COOKIE,
            refresh_token,
            refresh_max_age_secs,
            REFRESH_PATH,
        ),
    ]
}

/// The `Set-Cookie` pair clearing both session cookies.
pub fn clear_session_cookies() -> [String; 2] {
    [
        session_cookie(ACCESS_COOKIE, "", 0, "/"),
        session_cookie(REFRESH_COOKIE, "", 0, REFRESH_PATH),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_are_http_only_and_scoped() {
        let [access, refresh] = set_session_cookies("at", 900, "rt", 604800);

        assert!(access.starts_with("access_token=at;"));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Lax"));
        assert!(access.contains("Path=/;"));
        assert_eq!(access.contains("Secure"), cfg!(not(feature = "dev")));
        assert_eq!(refresh.contains("Secure"), cfg!(not(feature = "dev")));

        assert!(refresh.starts_with("refresh_token=rt;"));
        assert!(refresh.contains("Path=/v1/auth;"));
        assert!(refresh.contains("Max-Age=604800"));
    }

    #[test]
    fn clearing_zeroes_value_and_age() {
        let [access, refresh] = clear_session_cookies();
        assert!(access.starts_with("access_token=;"));
        assert!(access.contains("Max-Age=0"));
        assert!(refresh.contains("Max-Age=0"));
    }
}
