// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! HMAC-SHA256 signature computation and comparison.
//!
//! The signing secret arrives as a base64 string in configuration and is
//! decoded to raw bytes for key material. A request's signature header may
//! carry several candidate signatures (key rotation), separated by commas
//! or whitespace; verification accepts an exact match against any one of
//! them, compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase-hex HMAC-SHA256 digest of `payload` under `secret`.
#[must_use]
pub fn compute_signature(secret: &[u8], payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check whether `expected` occurs in the candidate signature list.
///
/// `candidates` is the raw signature header or query value; it is split on
/// commas and whitespace and each piece is compared to `expected` with a
/// constant-time equality check. A candidate that merely *contains* the
/// expected digest as a substring does not match.
#[must_use]
pub fn verify_any(candidates: &str, expected: &str) -> bool {
    candidates
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .any(|candidate| {
            bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let secret = b"secret";
        let sig = compute_signature(secret, "v1::/hook:");
        assert!(verify_any(&sig, &sig));
    }

    #[test]
    fn payload_byte_flip_changes_signature() {
        let secret = b"secret";
        let sig = compute_signature(secret, "v1::/hook:");
        let flipped = compute_signature(secret, "v1::/hooj:");
        assert_ne!(sig, flipped);
        assert!(!verify_any(&flipped, &sig));
    }

    #[test]
    fn secret_byte_flip_changes_signature() {
        let sig = compute_signature(b"secret", "payload");
        let other = compute_signature(b"secrez", "payload");
        assert_ne!(sig, other);
    }

    #[test]
    fn known_vector_for_secret_and_empty_canonical_parts() {
        // HMAC-SHA256("secret", "v1::/hook:"), independently computed.
        assert_eq!(
            compute_signature(b"secret", "v1::/hook:"),
            "387b9392897a1548cabeee6cb620e25185cdc8b5ced04ee7d4dbc83aefe6e5e7"
        );
    }

    #[test]
    fn matches_any_candidate_in_rotation_list() {
        let expected = compute_signature(b"secret", "payload");
        let header = format!("aaaa,{expected}, bbbb");
        assert!(verify_any(&header, &expected));
    }

    #[test]
    fn substring_containment_is_not_a_match() {
        let expected = compute_signature(b"secret", "payload");
        let longer = format!("{expected}ff");
        assert!(!verify_any(&longer, &expected));
        let prefixed = format!("00{expected}");
        assert!(!verify_any(&prefixed, &expected));
    }

    #[test]
    fn empty_candidate_list_never_matches() {
        assert!(!verify_any("", "deadbeef"));
        assert!(!verify_any(" , ", "deadbeef"));
    }
}
