//! JWKS cache for Supabase JWT verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

use super::Claims;

/// Minimum time between two JWKS fetches.
const REFETCH_INTERVAL: Duration = Duration::from_secs(1);

/// JWKS response structure
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Individual JWK key
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// Cached key with expiration
#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    cached_at: Instant,
}

/// JWKS cache for validating Supabase JWTs
#[derive(Clone)]
pub struct JwksCache {
    inner: Arc<RwLock<JwksCacheInner>>,
    client: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    ttl: Duration,
}

struct JwksCacheInner {
    keys: HashMap<String, CachedKey>,
    last_fetch: Option<Instant>,
}

impl JwksCache {
    pub fn new(jwks_url: String, issuer: String, audience: String, ttl_seconds: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(JwksCacheInner {
                keys: HashMap::new(),
                last_fetch: None,
            })),
            client: reqwest::Client::new(),
            jwks_url,
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Verify a JWT token and return the claims
    pub async fn verify_token(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).context("Invalid JWT header")?;
        let kid = header.kid.context("JWT missing kid header")?;

        let decoding_key = self.get_or_fetch_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let token_data =
            decode::<Claims>(token, &decoding_key, &validation).context("JWT validation failed")?;

        Ok(token_data.claims)
    }

    /// Number of usable keys currently cached.
    pub fn key_count(&self) -> usize {
        self.inner.read().keys.len()
    }

    async fn get_or_fetch_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }

        self.refresh_keys().await?;

        self.inner
            .read()
            .keys
            .get(kid)
            .map(|c| c.key.clone())
            .with_context(|| format!("Key {kid} not found in JWKS"))
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.inner.read();
        cache
            .keys
            .get(kid)
            .filter(|cached| cached.cached_at.elapsed() < self.ttl)
            .map(|cached| cached.key.clone())
    }

    #[instrument(skip(self), fields(jwks_url = %self.jwks_url))]
    async fn refresh_keys(&self) -> Result<()> {
        let recently_fetched = self
            .inner
            .read()
            .last_fetch
            .is_some_and(|last| last.elapsed() < REFETCH_INTERVAL);
        if recently_fetched {
            return Ok(());
        }

        tracing::debug!("Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("Failed to fetch JWKS")?;

        if !response.status().is_success() {
            anyhow::bail!("JWKS fetch failed with status: {}", response.status());
        }

        let jwks: JwksResponse = response.json().await.context("Failed to parse JWKS")?;

        let mut cache = self.inner.write();
        cache.last_fetch = Some(Instant::now());

        for jwk in jwks.keys {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }

            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    tracing::debug!(kid = %jwk.kid, "Cached JWKS key");
                    cache.keys.insert(
                        jwk.kid,
                        CachedKey {
                            key,
                            cached_at: Instant::now(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, error = %e, "Failed to parse JWK");
                }
            }
        }

        tracing::info!(keys = cache.keys.len(), "JWKS cache refreshed");
        Ok(())
    }

    /// Pre-warm the cache by fetching keys
    pub async fn warm_cache(&self) -> Result<()> {
        self.refresh_keys().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    // 2048-bit RSA modulus, base64url encoded
    const MODULUS: &str = "weiBnJyQYNxwezBNUXbZkRdeg5Dv9PX18Lr7Hn2XPz_IRWPZAv7sq-IqnyMmQPneBKB3lV3V4mki8QwHpQT7DrRV0lxG8UaQGIUsqT7Os2CuuMEkMssS56p9Vy6p7mYp5Qkh2g0DeaL3nuVA8bisoFI5zod1Rk1U420phAmaUkcHRhX5gq0rk4WdeWbRrS_wwpzuk12qhjjrJVs_2qX-RmR7ur_pI_Moq1wk5ErpYCrjzj0-_8J2UfNiyQj-u7CIWKAsr3CDTz1qJ4I1iGFYe1sXuCXKRxrVQqzBOO_9Ys2cbo5hoFq5FDCDCW5ROsNvphRifQuUkUWJxSiCBbDPXw";

    fn cache_for(server: &MockServer) -> JwksCache {
        JwksCache::new(
            server.url("/jwks"),
            "https://auth.example.com".to_string(),
            "authenticated".to_string(),
            3600,
        )
    }

    #[tokio::test]
    async fn warm_cache_keeps_rsa_keys_only() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(200).json_body(json!({
                "keys": [
                    { "kid": "rsa-1", "kty": "RSA", "alg": "RS256", "n": MODULUS, "e": "AQAB" },
                    { "kid": "ec-1", "kty": "EC", "crv": "P-256", "x": "abc", "y": "def" }
                ]
            }));
        });

        let cache = cache_for(&server);
        cache.warm_cache().await.unwrap();
        assert_eq!(cache.key_count(), 1);
        mock.assert();
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(500);
        });

        let cache = cache_for(&server);
        assert!(cache.warm_cache().await.is_err());
        assert_eq!(cache.key_count(), 0);
    }

    #[tokio::test]
    async fn malformed_tokens_are_rejected_before_fetching() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(200).json_body(json!({ "keys": [] }));
        });

        let cache = cache_for(&server);
        assert!(cache.verify_token("not-a-jwt").await.is_err());
        assert_eq!(mock.calls(), 0);
    }
}
