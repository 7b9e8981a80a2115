// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Signing-timestamp freshness validation.
//!
//! Canva includes the signing time of a request in the `x-canva-timestamp`
//! header (or the `time` query parameter for the redirect flow). Requests
//! whose claimed signing time falls outside a tolerance window around the
//! server clock are rejected before any signature work happens.

/// Default tolerance window (seconds) between claimed and actual time.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Check whether a claimed signing time is within `tolerance_secs` of `now`.
///
/// The check is symmetric: stale timestamps (replay) and future timestamps
/// (clock skew or forgery) are both rejected. Callers parse missing or
/// non-numeric claims as `0`, which this arithmetic rejects naturally;
/// there is no separate "missing timestamp" path.
#[must_use]
pub fn is_fresh(claimed_secs: i64, now_secs: i64, tolerance_secs: i64) -> bool {
    (now_secs - claimed_secs).abs() < tolerance_secs
}

/// Parse a timestamp claim from a header or query value.
///
/// Anything that is not a well-formed integer collapses to `0` so that
/// [`is_fresh`] fails it.
#[must_use]
pub fn parse_claim(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0)
}
