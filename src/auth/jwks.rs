// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - JWKS is fetched via HTTPS only
//! - Decoded keys are cached with a configurable TTL
//! - A fetch failure surfaces as an authentication error; the service never
//!   accepts a token it could not verify

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Keys decoded from one JWKS fetch, indexed by key id.
struct KeyCache {
    /// kid → decoding key. Keys without a kid are stored under an empty id
    /// and returned by [`JwksManager::any_decoding_key`].
    keys: HashMap<String, (DecodingKey, Algorithm)>,
    fetched_at: Instant,
}

/// JWKS manager with caching.
///
/// Fetches the identity provider's key set and converts each entry to a
/// ready-to-use `DecodingKey` once per fetch, so per-request verification
/// is a map lookup.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<KeyCache>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g.,
    ///   `https://auth.example.com/.well-known/jwks.json`)
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create with custom cache TTL.
    #[allow(dead_code)]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a decoding key for the given key ID, fetching or refreshing the
    /// key set as needed.
    pub async fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return entry
                        .keys
                        .get(kid)
                        .cloned()
                        .ok_or(AuthError::NoMatchingKey);
                }
            }
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|entry| entry.keys.get(kid).cloned())
            .ok_or(AuthError::NoMatchingKey)
    }

    /// Get any cached decoding key (for tokens without a kid header).
    pub async fn any_decoding_key(&self) -> Result<(DecodingKey, Algorithm), AuthError> {
        let stale = {
            let cache = self.cache.read().await;
            match &*cache {
                Some(entry) => entry.fetched_at.elapsed() >= self.cache_ttl,
                None => true,
            }
        };

        if stale {
            self.refresh().await?;
        }

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|entry| entry.keys.values().next().cloned())
            .ok_or(AuthError::NoMatchingKey)
    }

    /// Fetch the key set and rebuild the cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            if let Ok(decoded) = jwk_to_decoding_key(jwk) {
                let kid = jwk.common.key_id.clone().unwrap_or_default();
                keys.insert(kid, decoded);
            }
        }

        let mut cache = self.cache.write().await;
        *cache = Some(KeyCache {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    /// Check if the key set is currently cached and fresh.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => entry.fetched_at.elapsed() < self.cache_ttl,
            None => false,
        }
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InternalError(format!("Failed to create EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
