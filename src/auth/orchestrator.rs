// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Per-endpoint verification recipes.
//!
//! Each externally exposed endpoint class maps to one recipe composing the
//! leaf verifiers in a fixed order: HTTP method, then timestamp freshness,
//! then signature. The first failure wins and nothing later runs. Bearer
//! endpoints use the [`Auth`](super::extractor::Auth) extractor instead; the
//! linking redirect composes the redirect recipe with the nonce handshake
//! and the query-token JWT check in its handler.

use axum::http::{HeaderMap, Method};
use serde::Deserialize;
use tracing::debug;

use super::canonical::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use super::error::AuthError;
use super::signature::{compute_signature, verify_any};
use super::timestamp::{is_fresh, parse_claim, DEFAULT_TOLERANCE_SECS};

/// Query parameters of the linking redirect.
///
/// `time`..`state` are covered by the signature; `nonce` belongs to the
/// CSRF handshake and `token` to the JWT check. Every field is defaulted:
/// an absent parameter must reach verification as an empty value and fail
/// there, not bounce off deserialization as a 400.
#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub extensions: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub signatures: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Shared tail of every recipe: freshness, then signature.
fn check(
    claimed_secs: i64,
    now_secs: i64,
    candidates: Option<&str>,
    payload: &str,
    secret: &[u8],
) -> Result<(), AuthError> {
    if !is_fresh(claimed_secs, now_secs, DEFAULT_TOLERANCE_SECS) {
        debug!(claimed_secs, now_secs, "rejected stale or future timestamp");
        return Err(AuthError::StaleOrFutureTimestamp);
    }

    let expected = compute_signature(secret, payload);
    let candidates = candidates.ok_or(AuthError::SignatureMismatch)?;
    if !verify_any(candidates, &expected) {
        debug!("no candidate signature matched the recomputed digest");
        return Err(AuthError::SignatureMismatch);
    }
    Ok(())
}

fn header_timestamp(headers: &HeaderMap) -> i64 {
    parse_claim(headers.get(TIMESTAMP_HEADER).and_then(|v| v.to_str().ok()))
}

fn header_candidates(headers: &HeaderMap) -> Option<&str> {
    headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
}

/// Verify a signed webhook-style POST.
pub fn verify_signed_post(
    method: &Method,
    headers: &HeaderMap,
    path: &str,
    body: &[u8],
    secret: &[u8],
    now_secs: i64,
) -> Result<(), AuthError> {
    if method != Method::POST {
        return Err(AuthError::InvalidMethod);
    }
    check(
        header_timestamp(headers),
        now_secs,
        header_candidates(headers),
        &canonical::post_payload(headers, path, body),
        secret,
    )
}

/// Verify a signed listing GET.
pub fn verify_signed_get(
    method: &Method,
    headers: &HeaderMap,
    path: &str,
    query: &[(String, String)],
    secret: &[u8],
    now_secs: i64,
) -> Result<(), AuthError> {
    if method != Method::GET {
        return Err(AuthError::InvalidMethod);
    }
    check(
        header_timestamp(headers),
        now_secs,
        header_candidates(headers),
        &canonical::get_payload(headers, path, query),
        secret,
    )
}

/// Verify the signed linking redirect (signature over the query fields).
pub fn verify_signed_redirect(
    method: &Method,
    params: &RedirectParams,
    secret: &[u8],
    now_secs: i64,
) -> Result<(), AuthError> {
    if method != Method::GET {
        return Err(AuthError::InvalidMethod);
    }
    check(
        parse_claim(Some(&params.time)),
        now_secs,
        Some(&params.signatures),
        &canonical::redirect_payload(
            &params.time,
            &params.user,
            &params.brand,
            &params.extensions,
            &params.state,
        ),
        secret,
    )
}
