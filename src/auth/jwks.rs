// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! JWKS (JSON Web Key Set) fetching and per-kid caching.
//!
//! ## Security
//!
//! - The key set is fetched from Canva via HTTPS only
//! - Keys are cached per `kid` with a configurable TTL (default 60 minutes)
//! - Concurrent misses coalesce into a single upstream fetch
//! - Upstream fetch frequency is capped by a minimum-interval rate limiter
//! - Fetch failures surface as rejections; nothing blocks past the timeout
//!
//! The network call sits behind the [`KeySetSource`] trait so verification
//! logic can be exercised without a live endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::error::AuthError;

/// Default cache TTL (60 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default upstream fetch timeout (30 seconds).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum interval between upstream fetch attempts.
pub const DEFAULT_MIN_FETCH_INTERVAL: Duration = Duration::from_secs(10);

/// Source of a JSON Web Key Set. The seam between the cache and the network.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set from upstream.
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set from Canva's JWKS endpoint over HTTPS.
pub struct HttpKeySource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a source for the given JWKS URL with the given fetch timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySource {
    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        // Failure classification happens here, at the boundary: only an
        // elapsed timeout becomes KeyFetchTimeout; every other transport or
        // parse failure is a missing signing key as far as callers go.
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url = %self.url, "JWKS fetch timed out");
                AuthError::KeyFetchTimeout
            } else {
                warn!(url = %self.url, error = %e, "JWKS fetch failed");
                AuthError::SigningKeyNotFound
            }
        })?;

        if !response.status().is_success() {
            warn!(
                url = %self.url,
                status = %response.status(),
                "JWKS endpoint returned non-success"
            );
            return Err(AuthError::SigningKeyNotFound);
        }

        response.json::<JwkSet>().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "JWKS response was not a valid key set");
            AuthError::SigningKeyNotFound
        })
    }
}

/// A cached public key, keyed by `kid` in [`KeyCache`].
struct CachedKey {
    jwk: Jwk,
    fetched_at: Instant,
}

/// Per-kid signing-key cache.
///
/// The only shared mutable state in the crate. Reads go through an `RwLock`;
/// the fetch path is serialized by an async mutex so that concurrent misses
/// for the same (or different) uncached kids trigger at most one upstream
/// call, with a re-check after the gate is acquired. A successful fetch
/// replaces the whole map; latest fetch wins.
pub struct KeyCache {
    source: Arc<dyn KeySetSource>,
    ttl: Duration,
    min_fetch_interval: Duration,
    keys: RwLock<HashMap<String, CachedKey>>,
    /// Fetch gate; holds the time of the last upstream attempt.
    fetch_gate: Mutex<Option<Instant>>,
}

impl KeyCache {
    /// Create a cache over an arbitrary key source.
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration, min_fetch_interval: Duration) -> Self {
        Self {
            source,
            ttl,
            min_fetch_interval,
            keys: RwLock::new(HashMap::new()),
            fetch_gate: Mutex::new(None),
        }
    }

    /// Create a cache backed by an HTTPS JWKS endpoint.
    pub fn over_http(
        url: impl Into<String>,
        ttl: Duration,
        fetch_timeout: Duration,
        min_fetch_interval: Duration,
    ) -> Self {
        Self::new(
            Arc::new(HttpKeySource::new(url, fetch_timeout)),
            ttl,
            min_fetch_interval,
        )
    }

    /// Resolve the decoding key for `kid`, fetching lazily on miss or expiry.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        if let Some(jwk) = self.lookup(kid, Instant::now()).await {
            return jwk_to_decoding_key(&jwk);
        }

        // Miss or expired entry. Coalesce behind the gate.
        let mut last_attempt = self.fetch_gate.lock().await;

        // Another caller may have refreshed the cache while we waited.
        if let Some(jwk) = self.lookup(kid, Instant::now()).await {
            return jwk_to_decoding_key(&jwk);
        }

        if let Some(at) = *last_attempt {
            if at.elapsed() < self.min_fetch_interval {
                debug!(kid, "JWKS fetch rate-limited and key not cached");
                return Err(AuthError::SigningKeyNotFound);
            }
        }
        *last_attempt = Some(Instant::now());

        let set = self.source.fetch_keys().await?;
        self.install(set, Instant::now()).await;

        match self.lookup(kid, Instant::now()).await {
            Some(jwk) => jwk_to_decoding_key(&jwk),
            None => {
                // Distinct from a fetch failure: the endpoint answered but
                // does not know this kid.
                warn!(kid, "kid absent from freshly fetched JWKS");
                Err(AuthError::SigningKeyNotFound)
            }
        }
    }

    /// Ensure the cache holds a fresh key set, fetching if necessary.
    ///
    /// Used by the readiness probe to warm the cache before the first token
    /// arrives. Honors the same fetch gate and rate limit as a lookup miss.
    pub async fn warm(&self) -> Result<(), AuthError> {
        if self.has_fresh_keys().await {
            return Ok(());
        }

        let mut last_attempt = self.fetch_gate.lock().await;

        if self.has_fresh_keys().await {
            return Ok(());
        }

        if let Some(at) = *last_attempt {
            if at.elapsed() < self.min_fetch_interval {
                return Err(AuthError::SigningKeyNotFound);
            }
        }
        *last_attempt = Some(Instant::now());

        let set = self.source.fetch_keys().await?;
        self.install(set, Instant::now()).await;
        Ok(())
    }

    /// Whether at least one unexpired key is cached. Used by readiness probes.
    pub async fn has_fresh_keys(&self) -> bool {
        let now = Instant::now();
        let keys = self.keys.read().await;
        keys.values().any(|e| !expired(e.fetched_at, now, self.ttl))
    }

    async fn lookup(&self, kid: &str, now: Instant) -> Option<Jwk> {
        let keys = self.keys.read().await;
        keys.get(kid)
            .filter(|entry| !expired(entry.fetched_at, now, self.ttl))
            .map(|entry| entry.jwk.clone())
    }

    async fn install(&self, set: JwkSet, now: Instant) {
        let mut fresh = HashMap::with_capacity(set.keys.len());
        for jwk in set.keys {
            if let Some(kid) = jwk.common.key_id.clone() {
                fresh.insert(
                    kid,
                    CachedKey {
                        jwk,
                        fetched_at: now,
                    },
                );
            }
        }
        let mut keys = self.keys.write().await;
        *keys = fresh;
    }
}

/// An entry fetched at `fetched_at` is served until `ttl` has elapsed.
fn expired(fetched_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.duration_since(fetched_at) >= ttl
}

/// Convert a JWK to a DecodingKey with its expected algorithm.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e).map_err(|e| {
                warn!(error = %e, "JWKS entry carried unusable RSA components");
                AuthError::SigningKeyNotFound
            })?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::RS384 => Algorithm::RS384,
                    jsonwebtoken::jwk::KeyAlgorithm::RS512 => Algorithm::RS512,
                    _ => Algorithm::RS256,
                })
                .unwrap_or(Algorithm::RS256);

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y).map_err(|e| {
                warn!(error = %e, "JWKS entry carried unusable EC components");
                AuthError::SigningKeyNotFound
            })?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::ES384 => Algorithm::ES384,
                    _ => Algorithm::ES256,
                })
                .unwrap_or(Algorithm::ES256);

            Ok((key, alg))
        }
        _ => {
            warn!("JWKS entry has an unsupported key type");
            Err(AuthError::SigningKeyNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// RSA modulus from RFC 7517 appendix A.1 (a real 2048-bit key).
    const RFC7517_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx\
        4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMs\
        tn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2\
        QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbI\
        SD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqb\
        w0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn rsa_set(kid: &str) -> JwkSet {
        serde_json::from_value(serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "kid": kid,
                "n": RFC7517_N,
                "e": "AQAB",
            }]
        }))
        .unwrap()
    }

    struct CountingSource {
        set: JwkSet,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingSource {
        fn new(set: JwkSet) -> Self {
            Self {
                set,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(set: JwkSet, delay: Duration) -> Self {
            Self {
                set,
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl KeySetSource for CountingSource {
        async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.set.clone())
        }
    }

    #[test]
    fn entry_is_fresh_until_ttl_and_expired_after() {
        let ttl = Duration::from_secs(3600);
        let fetched = Instant::now();
        assert!(!expired(fetched, fetched + Duration::from_secs(3599), ttl));
        assert!(expired(fetched, fetched + Duration::from_secs(3601), ttl));
    }

    #[tokio::test]
    async fn cache_hit_does_not_refetch() {
        let source = Arc::new(CountingSource::new(rsa_set("abc")));
        let cache = KeyCache::new(
            source.clone(),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );

        cache.get_decoding_key("abc").await.unwrap();
        cache.get_decoding_key("abc").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_exactly_one_refetch() {
        let source = Arc::new(CountingSource::new(rsa_set("abc")));
        let ttl = Duration::from_millis(40);
        let cache = KeyCache::new(source.clone(), ttl, Duration::ZERO);

        cache.get_decoding_key("abc").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Wait the entry out, then hit it twice: the first lookup refetches
        // and reinstalls, the second is served from the fresh entry.
        tokio::time::sleep(ttl + Duration::from_millis(20)).await;
        cache.get_decoding_key("abc").await.unwrap();
        cache.get_decoding_key("abc").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_kid_fails_without_a_second_fetch() {
        let source = Arc::new(CountingSource::new(rsa_set("abc")));
        let cache = KeyCache::new(
            source.clone(),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );

        let err = cache.get_decoding_key("xyz").await.unwrap_err();
        assert_eq!(err, AuthError::SigningKeyNotFound);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // The rate limiter holds the second miss back from the network.
        let err = cache.get_decoding_key("xyz").await.unwrap_err();
        assert_eq!(err, AuthError::SigningKeyNotFound);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // The key that was in the fetched set is served from cache.
        cache.get_decoding_key("abc").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_fetch() {
        let source = Arc::new(CountingSource::slow(
            rsa_set("abc"),
            Duration::from_millis(50),
        ));
        let cache = Arc::new(KeyCache::new(
            source.clone(),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        ));

        let (a, b) = tokio::join!(cache.get_decoding_key("abc"), cache.get_decoding_key("abc"));
        a.unwrap();
        b.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_failure_propagates() {
        struct FailingSource;

        #[async_trait]
        impl KeySetSource for FailingSource {
            async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
                Err(AuthError::KeyFetchTimeout)
            }
        }

        let cache = KeyCache::new(
            Arc::new(FailingSource),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );
        let err = cache.get_decoding_key("abc").await.unwrap_err();
        assert_eq!(err, AuthError::KeyFetchTimeout);
    }

    #[tokio::test]
    async fn warm_fetches_once_and_then_serves_from_cache() {
        let source = Arc::new(CountingSource::new(rsa_set("abc")));
        let cache = KeyCache::new(
            source.clone(),
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );

        cache.warm().await.unwrap();
        assert!(cache.has_fresh_keys().await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        cache.warm().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // The warmed set serves lookups without another fetch.
        cache.get_decoding_key("abc").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn readiness_reflects_cache_state() {
        let source = Arc::new(CountingSource::new(rsa_set("abc")));
        let cache = KeyCache::new(
            source,
            DEFAULT_CACHE_TTL,
            DEFAULT_MIN_FETCH_INTERVAL,
        );
        assert!(!cache.has_fresh_keys().await);
        cache.get_decoding_key("abc").await.unwrap();
        assert!(cache.has_fresh_keys().await);
    }
}
