// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Canonical payload construction for signed Canva requests.
//!
//! Canva signs a deterministic serialization of each request; verification
//! recomputes the exact same string locally. The serialization is version
//! pinned (`v1`) and comes in three forms:
//!
//! - POST:     `v1:{headers}:{path}:{body}`
//! - GET:      `v1:{headers}:{path}:{query}`
//! - Redirect: `v1:{time}:{user}:{brand}:{extensions}:{state}`
//!
//! Header and query canonicalization select `x-canva-*` entries (minus a
//! deny-list), sort the names lexicographically (case-insensitive) and join
//! the *values* with `:`. An empty selection yields an empty segment, which
//! is still valid and still signed.

use axum::http::HeaderMap;

/// Canonical payload version literal.
pub const VERSION: &str = "v1";

/// Header carrying the candidate signature list.
pub const SIGNATURE_HEADER: &str = "x-canva-signatures";

/// Header carrying the claimed signing time (epoch seconds).
pub const TIMESTAMP_HEADER: &str = "x-canva-timestamp";

/// Prefix selecting signable header and query names.
const SIGNED_PREFIX: &str = "x-canva-";

/// Names never included in the canonical string: the signature itself, the
/// timestamp (validated separately), and anything stamped on by proxies.
fn is_signable(name: &str) -> bool {
    name.starts_with(SIGNED_PREFIX)
        && name != SIGNATURE_HEADER
        && name != TIMESTAMP_HEADER
        && !name.starts_with("x-forwarded-")
}

/// Sort selected pairs by (lowercased) name and join their values with `:`.
fn canonical_join(mut pairs: Vec<(String, String)>) -> String {
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
    values.join(":")
}

/// Canonicalize the signable subset of request headers.
///
/// Header values that are not valid UTF-8 are skipped; Canva never signs
/// such values and including replacement characters would only guarantee a
/// mismatch.
#[must_use]
pub fn canonical_header_string(headers: &HeaderMap) -> String {
    let pairs: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().to_ascii_lowercase();
            if !is_signable(&name) {
                return None;
            }
            value.to_str().ok().map(|v| (name, v.to_string()))
        })
        .collect();
    canonical_join(pairs)
}

/// Canonicalize the signable subset of query parameters.
#[must_use]
pub fn canonical_query_string(query: &[(String, String)]) -> String {
    let pairs: Vec<(String, String)> = query
        .iter()
        .filter(|(name, _)| is_signable(&name.to_ascii_lowercase()))
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect();
    canonical_join(pairs)
}

/// Build the canonical payload for a signed POST (webhook) request.
#[must_use]
pub fn post_payload(headers: &HeaderMap, path: &str, body: &[u8]) -> String {
    format!(
        "{VERSION}:{}:{path}:{}",
        canonical_header_string(headers),
        String::from_utf8_lossy(body)
    )
}

/// Build the canonical payload for a signed GET (listing) request.
#[must_use]
pub fn get_payload(headers: &HeaderMap, path: &str, query: &[(String, String)]) -> String {
    format!(
        "{VERSION}:{}:{path}:{}",
        canonical_header_string(headers),
        canonical_query_string(query)
    )
}

/// Build the canonical payload for the linking redirect.
///
/// Field order is fixed by the scheme; nothing is sorted here.
#[must_use]
pub fn redirect_payload(
    time: &str,
    user: &str,
    brand: &str,
    extensions: &str,
    state: &str,
) -> String {
    format!("{VERSION}:{time}:{user}:{brand}:{extensions}:{state}")
}
