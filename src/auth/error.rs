// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Authentication rejection taxonomy.
//!
//! Every verifier returns `Result<_, AuthError>`; no verifier raises past
//! its own boundary for an expected condition. The HTTP layer maps each
//! variant to a response: a 401 JSON body for API endpoints, or (for the
//! browser-facing redirect flow) a redirect carrying error query params.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Terminal authentication rejection. Nothing here is retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong HTTP verb for the endpoint (checked before any verification).
    InvalidMethod,
    /// Claimed signing time outside the tolerance window.
    StaleOrFutureTimestamp,
    /// Recomputed HMAC matches no candidate signature.
    SignatureMismatch,
    /// Bearer/query token absent or not token-shaped.
    MissingOrInvalidToken,
    /// Token header carries no key identifier.
    UnverifiableToken,
    /// Key fetch failed, or the kid is absent from the fetched set.
    SigningKeyNotFound,
    /// Cryptographic signature or audience failure on the JWT.
    InvalidSignature,
    /// JWT past its expiry.
    TokenExpired,
    /// Required identity claims missing from the payload.
    MalformedPayload,
    /// CSRF handshake nonce missing, expired, or mismatched.
    InvalidNonce,
    /// Upstream JWKS endpoint unresponsive within the fetch budget.
    KeyFetchTimeout,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AuthError {
    /// Stable snake_case code, used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidMethod => "invalid_method",
            AuthError::StaleOrFutureTimestamp => "stale_or_future_timestamp",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::MissingOrInvalidToken => "missing_or_invalid_token",
            AuthError::UnverifiableToken => "unverifiable_token",
            AuthError::SigningKeyNotFound => "signing_key_not_found",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::MalformedPayload => "malformed_payload",
            AuthError::InvalidNonce => "invalid_nonce",
            AuthError::KeyFetchTimeout => "key_fetch_timeout",
        }
    }

    /// HTTP status for this rejection. Everything is a 401: upstream
    /// failures must not leak a different status to unauthenticated callers.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Whether the response body may carry the human-readable message.
    ///
    /// A missing kid says something about how the token was minted; that
    /// detail stays in the logs.
    fn leaks_no_detail(&self) -> bool {
        matches!(self, AuthError::UnverifiableToken)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidMethod => write!(f, "HTTP method not allowed for this endpoint"),
            AuthError::StaleOrFutureTimestamp => {
                write!(f, "Request timestamp outside the accepted window")
            }
            AuthError::SignatureMismatch => write!(f, "Failed signature test"),
            AuthError::MissingOrInvalidToken => {
                write!(f, "Bearer token is missing or malformed")
            }
            AuthError::UnverifiableToken => write!(f, "Token cannot be verified"),
            AuthError::SigningKeyNotFound => write!(f, "No signing key available for this token"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::MalformedPayload => write!(f, "Token payload is missing required claims"),
            AuthError::InvalidNonce => write!(f, "Invalid or expired nonce"),
            AuthError::KeyFetchTimeout => write!(f, "Signing key lookup timed out"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = if self.leaks_no_detail() {
            None
        } else {
            Some(self.to_string())
        };
        let body = Json(AuthErrorBody {
            error: "unauthorized",
            message,
        });
        (self.status_code(), body).into_response()
    }
}
