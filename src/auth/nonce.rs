// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Nonce/CSRF handshake for the account-linking redirect.
//!
//! Phase A generates a random UUID nonce and stores `[nonce, expiresAt]` in
//! a signed, short-lived cookie while the same nonce travels to Canva in the
//! redirect query string. Phase B requires the returned query nonce to match
//! the cookie byte-for-byte, inside the expiry window. The cookie is cleared
//! as soon as it is read, valid or not, so a handshake value is single
//! use. There is no server-side nonce store.
//!
//! The cookie value is `base64url(payload) . hex(HMAC-SHA256(payload))`
//! under the cookie-signing secret, so a tampered cookie fails before its
//! content is ever interpreted.

use base64ct::{Base64UrlUnpadded, Encoding};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::error::AuthError;
use super::signature::{compute_signature, verify_any};

/// Name of the handshake cookie.
pub const NONCE_COOKIE: &str = "nonceWithExpiry";

/// A freshly issued handshake nonce and its Set-Cookie header value.
#[derive(Debug)]
pub struct IssuedNonce {
    /// The nonce forwarded to Canva in the redirect query string.
    pub nonce: String,
    /// `Set-Cookie` header value storing the signed `[nonce, expiresAt]`.
    pub set_cookie: String,
}

/// Phase A: mint a nonce and its signed cookie.
pub fn issue(cookie_secret: &[u8], now_millis: i64, ttl_millis: i64) -> IssuedNonce {
    let nonce = Uuid::new_v4().to_string();
    let expires_at = now_millis + ttl_millis;

    let payload = serde_json::to_string(&(nonce.as_str(), expires_at))
        .expect("a (str, i64) pair always serializes");
    let value = format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(payload.as_bytes()),
        compute_signature(cookie_secret, &payload)
    );

    let max_age_secs = ttl_millis / 1000;
    let set_cookie = format!(
        "{NONCE_COOKIE}={value}; Path=/; Secure; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );

    IssuedNonce { nonce, set_cookie }
}

/// `Set-Cookie` header value that clears the handshake cookie.
///
/// Sent on every Phase B response, success or failure.
pub fn clear_cookie() -> String {
    format!("{NONCE_COOKIE}=; Path=/; Secure; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Phase B: validate the returned query nonce against the signed cookie.
pub fn validate(
    raw_cookie: Option<&str>,
    query_nonce: &str,
    cookie_secret: &[u8],
    now_millis: i64,
) -> Result<(), AuthError> {
    let raw = raw_cookie.ok_or(AuthError::InvalidNonce)?;

    let (encoded, signature) = raw.split_once('.').ok_or(AuthError::InvalidNonce)?;
    let payload_bytes =
        Base64UrlUnpadded::decode_vec(encoded).map_err(|_| AuthError::InvalidNonce)?;
    let payload = String::from_utf8(payload_bytes).map_err(|_| AuthError::InvalidNonce)?;

    if !verify_any(signature, &compute_signature(cookie_secret, &payload)) {
        return Err(AuthError::InvalidNonce);
    }

    let (cookie_nonce, expires_at): (String, i64) =
        serde_json::from_str(&payload).map_err(|_| AuthError::InvalidNonce)?;

    if now_millis > expires_at {
        return Err(AuthError::InvalidNonce);
    }
    if cookie_nonce.is_empty() || query_nonce.is_empty() {
        return Err(AuthError::InvalidNonce);
    }
    if !bool::from(cookie_nonce.as_bytes().ct_eq(query_nonce.as_bytes())) {
        return Err(AuthError::InvalidNonce);
    }

    Ok(())
}

/// Pull a cookie value out of a `Cookie` request header.
pub fn find_cookie<'a>(cookie_header: Option<&'a str>, name: &str) -> Option<&'a str> {
    cookie_header?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"cookie-secret";
    const NOW: i64 = 1_700_000_000_000;
    const TTL: i64 = 300_000;

    fn cookie_value(issued: &IssuedNonce) -> &str {
        issued
            .set_cookie
            .strip_prefix("nonceWithExpiry=")
            .and_then(|rest| rest.split(';').next())
            .unwrap()
    }

    #[test]
    fn issued_cookie_carries_required_flags() {
        let issued = issue(SECRET, NOW, TTL);
        assert!(issued.set_cookie.contains("HttpOnly"));
        assert!(issued.set_cookie.contains("Secure"));
        assert!(issued.set_cookie.contains("Max-Age=300"));
        assert!(issued.set_cookie.contains("Path=/"));
    }

    #[test]
    fn round_trip_validates() {
        let issued = issue(SECRET, NOW, TTL);
        let value = cookie_value(&issued);
        assert!(validate(Some(value), &issued.nonce, SECRET, NOW + 1000).is_ok());
    }

    #[test]
    fn missing_cookie_is_rejected() {
        assert_eq!(
            validate(None, "some-nonce", SECRET, NOW).unwrap_err(),
            AuthError::InvalidNonce
        );
    }

    #[test]
    fn expired_cookie_is_rejected() {
        let issued = issue(SECRET, NOW, TTL);
        let value = cookie_value(&issued);
        assert_eq!(
            validate(Some(value), &issued.nonce, SECRET, NOW + TTL + 1).unwrap_err(),
            AuthError::InvalidNonce
        );
    }

    #[test]
    fn tampered_payload_fails_the_signature() {
        let issued = issue(SECRET, NOW, TTL);
        let value = cookie_value(&issued);
        let (encoded, sig) = value.split_once('.').unwrap();

        // Re-encode a different nonce with the original signature.
        let forged_payload =
            serde_json::to_string(&("forged-nonce", NOW + TTL)).unwrap();
        let forged = format!(
            "{}.{sig}",
            Base64UrlUnpadded::encode_string(forged_payload.as_bytes())
        );
        assert!(validate(Some(&forged), "forged-nonce", SECRET, NOW).is_err());

        // And a truncated cookie fails to parse at all.
        assert!(validate(Some(encoded), &issued.nonce, SECRET, NOW).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = issue(SECRET, NOW, TTL);
        let value = cookie_value(&issued);
        assert!(validate(Some(value), &issued.nonce, b"other-secret", NOW).is_err());
    }

    #[test]
    fn nonce_mismatch_is_rejected() {
        let issued = issue(SECRET, NOW, TTL);
        let value = cookie_value(&issued);
        assert!(validate(Some(value), "different-nonce", SECRET, NOW).is_err());
        assert!(validate(Some(value), "", SECRET, NOW).is_err());
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cleared = clear_cookie();
        assert!(cleared.starts_with("nonceWithExpiry=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[test]
    fn find_cookie_parses_a_cookie_header() {
        let header = "a=1; nonceWithExpiry=abc.def; b=2";
        assert_eq!(find_cookie(Some(header), NONCE_COOKIE), Some("abc.def"));
        assert_eq!(find_cookie(Some("a=1"), NONCE_COOKIE), None);
        assert_eq!(find_cookie(None, NONCE_COOKIE), None);
    }
}
