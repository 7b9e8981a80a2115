// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

use std::sync::Arc;

use crate::auth::jwks::KeyCache;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwks: Arc<KeyCache>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let jwks = KeyCache::over_http(
            config.jwks_url.clone(),
            config.jwks_cache_ttl,
            config.jwks_fetch_timeout,
            config.jwks_min_fetch_interval,
        );
        Self {
            config: Arc::new(config),
            jwks: Arc::new(jwks),
        }
    }

    /// Build state over an injected key cache. Used by tests to swap the
    /// network source for a mock.
    pub fn with_jwks(config: AppConfig, jwks: Arc<KeyCache>) -> Self {
        Self {
            config: Arc::new(config),
            jwks,
        }
    }
}
