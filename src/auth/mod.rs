// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! # Authentication Module
//!
//! Everything that decides whether an inbound request came from Canva, and
//! on behalf of which user. Three mechanisms share this module:
//!
//! 1. **Signed requests** (webhook POSTs, listing GETs, the linking
//!    redirect): HMAC-SHA256 over a canonical payload, carried in
//!    `x-canva-signatures`, with a freshness check on `x-canva-timestamp`.
//! 2. **User tokens**: RS256 JWTs verified against Canva's JWKS, with the
//!    public keys cached per `kid`.
//! 3. **Linking nonce**: a signed, single-use cookie closing the CSRF
//!    window in the account-linking handshake.
//!
//! ## Security
//!
//! - Every failure maps to HTTP 401 with a stable machine-readable code
//! - Signature comparison is constant-time
//! - JWKS fetching is HTTPS-only, cached with TTL, rate-limited upstream
//! - Clock skew tolerance is 60 seconds for JWTs, 300 for signed requests

pub mod canonical;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod nonce;
pub mod orchestrator;
pub mod signature;
pub mod timestamp;
pub mod verifier;

pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::KeyCache;
pub use verifier::AuthenticatedIdentity;
