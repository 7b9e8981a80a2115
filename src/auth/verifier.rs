// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Canva JWT verification.
//!
//! Verification runs a fixed sequence, short-circuiting on the first
//! failure:
//!
//! 1. Extract the raw token (bearer header, or a `token` query parameter on
//!    the redirect endpoint; extraction is the caller's choice, the rest of
//!    the pipeline is shared)
//! 2. Decode the header and require a `kid`
//! 3. Resolve the public key through the [`KeyCache`](super::jwks::KeyCache)
//! 4. Verify signature + audience + expiry
//! 5. Require the identity claims (`userId`, `brandId`, `aud`)
//!
//! Success produces an [`AuthenticatedIdentity`] for downstream handlers.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, decode_header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use super::error::AuthError;
use super::jwks::KeyCache;

/// Clock skew tolerance for `exp`/`nbf` (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Identity extracted from a verified Canva token.
///
/// Attached to the request for the remainder of its lifecycle; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedIdentity {
    /// The Canva app this backend serves (the token audience).
    pub app_id: String,
    /// The Canva team ("brand") the acting user belongs to.
    pub brand_id: String,
    /// The acting Canva user.
    pub user_id: String,
}

/// Claims carried by a Canva user token.
///
/// Fields are optional so that a signature failure is reported before a
/// missing claim: deserialization must not fail ahead of the post-decode
/// claim checks.
#[derive(Debug, Deserialize)]
struct CanvaClaims {
    #[serde(default)]
    aud: Option<String>,
    #[serde(default, rename = "userId")]
    user_id: Option<String>,
    #[serde(default, rename = "brandId")]
    brand_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    exp: Option<i64>,
}

/// Check that a candidate string is shaped like a compact JWS: three
/// non-empty base64url segments.
fn looks_like_jwt(candidate: &str) -> bool {
    let segments: Vec<&str> = candidate.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

/// Extract a bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingOrInvalidToken)?
        .to_str()
        .map_err(|_| AuthError::MissingOrInvalidToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingOrInvalidToken)?
        .trim();

    if !looks_like_jwt(token) {
        return Err(AuthError::MissingOrInvalidToken);
    }
    Ok(token)
}

/// Extract a token supplied as a query parameter (redirect flow).
pub fn query_token(raw: Option<&str>) -> Result<&str, AuthError> {
    let token = raw.ok_or(AuthError::MissingOrInvalidToken)?;
    if !looks_like_jwt(token) {
        return Err(AuthError::MissingOrInvalidToken);
    }
    Ok(token)
}

/// Verify a raw token string and produce the authenticated identity.
///
/// `expected_audience` is the configured Canva app id.
pub async fn verify_token(
    token: &str,
    jwks: &KeyCache,
    expected_audience: &str,
) -> Result<AuthenticatedIdentity, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MissingOrInvalidToken)?;

    let kid = header.kid.ok_or(AuthError::UnverifiableToken)?;

    let (decoding_key, algorithm) = jwks.get_decoding_key(&kid).await?;

    let mut validation = Validation::new(algorithm);
    validation.set_audience(&[expected_audience]);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    let token_data =
        decode::<CanvaClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature
            | jsonwebtoken::errors::ErrorKind::InvalidAudience
            | jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::Json(_)
            | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                AuthError::MalformedPayload
            }
            _ => AuthError::MissingOrInvalidToken,
        })?;

    let identity = identity_from_claims(token_data.claims)?;
    debug!(
        user_id = %identity.user_id,
        brand_id = %identity.brand_id,
        "verified Canva user token"
    );
    Ok(identity)
}

/// Require the identity claims and build the result.
fn identity_from_claims(claims: CanvaClaims) -> Result<AuthenticatedIdentity, AuthError> {
    let app_id = claims.aud.filter(|s| !s.is_empty());
    let user_id = claims.user_id.filter(|s| !s.is_empty());
    let brand_id = claims.brand_id.filter(|s| !s.is_empty());

    match (app_id, brand_id, user_id) {
        (Some(app_id), Some(brand_id), Some(user_id)) => Ok(AuthenticatedIdentity {
            app_id,
            brand_id,
            user_id,
        }),
        _ => Err(AuthError::MalformedPayload),
    }
}
