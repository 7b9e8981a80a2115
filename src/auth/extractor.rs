// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Axum extractor for bearer-authenticated Canva users.
//!
//! Use the `Auth` extractor in handlers to require a verified user token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is AuthenticatedIdentity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::AuthError;
use super::verifier::{self, AuthenticatedIdentity};
use crate::state::AppState;

/// Extractor requiring a verified Canva user token.
///
/// Pulls the bearer token from the `Authorization` header and runs it
/// through the full verification pipeline against the cached JWKS. A
/// rejection renders as the standard 401 envelope.
pub struct Auth(pub AuthenticatedIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A verified identity may already be attached upstream.
        if let Some(identity) = parts.extensions.get::<AuthenticatedIdentity>().cloned() {
            return Ok(Auth(identity));
        }

        let token = verifier::bearer_token(&parts.headers)?;
        let identity = verifier::verify_token(token, &state.jwks, &state.config.app_id).await?;

        Ok(Auth(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::{
        KeyCache, KeySetSource, DEFAULT_CACHE_TTL, DEFAULT_MIN_FETCH_INTERVAL,
    };
    use crate::config::AppConfig;
    use async_trait::async_trait;
    use axum::http::Request;
    use jsonwebtoken::jwk::JwkSet;
    use std::sync::Arc;
    use std::time::Duration;

    struct EmptySource;

    #[async_trait]
    impl KeySetSource for EmptySource {
        async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
            Ok(JwkSet { keys: vec![] })
        }
    }

    fn test_state() -> AppState {
        let config = AppConfig {
            app_id: "app-123".to_string(),
            signing_secret: b"secret".to_vec(),
            cookie_secret: b"cookie-secret".to_vec(),
            jwks_url: "https://api.canva.com/rest/v1/apps/app-123/jwks".to_string(),
            authorize_url: "https://www.canva.com/apps/configure/link".to_string(),
            configured_redirect_url: "https://www.canva.com/apps/configured".to_string(),
            jwks_cache_ttl: DEFAULT_CACHE_TTL,
            jwks_fetch_timeout: Duration::from_secs(30),
            jwks_min_fetch_interval: DEFAULT_MIN_FETCH_INTERVAL,
            nonce_ttl_ms: 300_000,
        };
        let cache = KeyCache::new(
            Arc::new(EmptySource),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );
        AppState::with_jwks(config, Arc::new(cache))
    }

    #[tokio::test]
    async fn extractor_rejects_a_missing_header() {
        let state = test_state();
        let mut parts = Request::builder()
            .uri("/v1/me")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingOrInvalidToken)));
    }

    #[tokio::test]
    async fn extractor_prefers_an_attached_identity() {
        let state = test_state();
        let mut parts = Request::builder()
            .uri("/v1/me")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        parts.extensions.insert(AuthenticatedIdentity {
            app_id: "app-123".to_string(),
            brand_id: "brand-1".to_string(),
            user_id: "user-1".to_string(),
        });

        let Auth(identity) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity.user_id, "user-1");
    }

    #[tokio::test]
    async fn extractor_rejects_a_malformed_bearer_value() {
        let state = test_state();
        let mut parts = Request::builder()
            .uri("/v1/me")
            .header("Authorization", "Bearer not-a-jwt")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingOrInvalidToken)));
    }
}
