// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once, at startup, into
//! an explicit [`AppConfig`] that is passed into the router state. No
//! verifier reads ambient process state; a missing required value aborts
//! startup instead of surfacing per-request.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CANVA_APP_ID` | Canva app identifier (JWT audience) | required |
//! | `CANVA_SIGNING_SECRET` | Request-signing secret, base64 | required |
//! | `COOKIE_SIGNING_SECRET` | Secret signing the nonce cookie | required |
//! | `CANVA_BASE_URL` | Canva REST API base (JWKS host) | `https://api.canva.com` |
//! | `CANVA_AUTHORIZE_URL` | Linking authorization page | `https://www.canva.com/apps/configure/link` |
//! | `CANVA_CONFIGURED_REDIRECT_URL` | Post-linking return page | `https://www.canva.com/apps/configured` |
//! | `JWKS_CACHE_TTL_MS` | Signing-key cache TTL | `3600000` |
//! | `JWKS_FETCH_TIMEOUT_MS` | JWKS fetch timeout | `30000` |
//! | `JWKS_MIN_FETCH_INTERVAL_MS` | Floor between JWKS fetches | `10000` |
//! | `NONCE_TTL_MS` | Linking-handshake nonce lifetime | `300000` |
//! | `HOST` / `PORT` | Bind address | `0.0.0.0` / `8080` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use base64ct::{Base64, Encoding};
use thiserror::Error;

const DEFAULT_CANVA_BASE_URL: &str = "https://api.canva.com";
const DEFAULT_AUTHORIZE_URL: &str = "https://www.canva.com/apps/configure/link";
const DEFAULT_CONFIGURED_REDIRECT_URL: &str = "https://www.canva.com/apps/configured";

const DEFAULT_JWKS_CACHE_TTL_MS: u64 = 3_600_000;
const DEFAULT_JWKS_FETCH_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_JWKS_MIN_FETCH_INTERVAL_MS: u64 = 10_000;
const DEFAULT_NONCE_TTL_MS: i64 = 300_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(String),

    #[error("configuration invalid: {0}")]
    Invalid(String),
}

/// Application configuration, constructed once per deployment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Canva app identifier; doubles as the expected JWT audience.
    pub app_id: String,
    /// Raw HMAC key material (base64-decoded from the env value).
    pub signing_secret: Vec<u8>,
    /// Secret signing the nonce handshake cookie.
    pub cookie_secret: Vec<u8>,
    /// Fully resolved JWKS endpoint for this app.
    pub jwks_url: String,
    /// Canva page the linking flow redirects the user agent to.
    pub authorize_url: String,
    /// Canva page the user agent returns to after linking completes.
    pub configured_redirect_url: String,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub jwks_min_fetch_interval: Duration,
    /// Nonce lifetime in milliseconds.
    pub nonce_ttl_ms: i64,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_id = env_required("CANVA_APP_ID")?;

        let signing_secret_b64 = env_required("CANVA_SIGNING_SECRET")?;
        let signing_secret = Base64::decode_vec(&signing_secret_b64).map_err(|_| {
            ConfigError::Invalid("CANVA_SIGNING_SECRET is not valid base64".to_string())
        })?;

        let cookie_secret = env_required("COOKIE_SIGNING_SECRET")?.into_bytes();

        let canva_base_url = env_or_default("CANVA_BASE_URL", DEFAULT_CANVA_BASE_URL);
        let jwks_url = format!(
            "{}/rest/v1/apps/{app_id}/jwks",
            canva_base_url.trim_end_matches('/')
        );

        Ok(Self {
            app_id,
            signing_secret,
            cookie_secret,
            jwks_url,
            authorize_url: env_or_default("CANVA_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL),
            configured_redirect_url: env_or_default(
                "CANVA_CONFIGURED_REDIRECT_URL",
                DEFAULT_CONFIGURED_REDIRECT_URL,
            ),
            jwks_cache_ttl: env_duration_ms("JWKS_CACHE_TTL_MS", DEFAULT_JWKS_CACHE_TTL_MS)?,
            jwks_fetch_timeout: env_duration_ms(
                "JWKS_FETCH_TIMEOUT_MS",
                DEFAULT_JWKS_FETCH_TIMEOUT_MS,
            )?,
            jwks_min_fetch_interval: env_duration_ms(
                "JWKS_MIN_FETCH_INTERVAL_MS",
                DEFAULT_JWKS_MIN_FETCH_INTERVAL_MS,
            )?,
            nonce_ttl_ms: env_i64_ms("NONCE_TTL_MS", DEFAULT_NONCE_TTL_MS)?,
        })
    }
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env_optional(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_duration_ms(name: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    let millis = match env_optional(name) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer (ms)")))?,
        None => default_ms,
    };
    Ok(Duration::from_millis(millis))
}

fn env_i64_ms(name: &str, default_ms: i64) -> Result<i64, ConfigError> {
    match env_optional(name) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer (ms)"))),
        None => Ok(default_ms),
    }
}
