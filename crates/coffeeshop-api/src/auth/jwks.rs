//! JSON Web Key Set retrieval and caching.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::error::{AuthError, AuthResult, AuthSetupError};

/// Upper bound on cached keys; identity providers publish a handful.
const MAX_CACHED_KEYS: u64 = 100;

/// JWKS documents larger than this are refused.
const MAX_JWKS_BYTES: u64 = 512 * 1024;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a `kid` absent from a fresh key set is answered without refetching.
const MISSING_KID_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Resolves RSA signing keys by `kid`, fetching the key set on a cache miss.
#[derive(Clone)]
pub struct JwksProvider {
    cache: Cache<String, Arc<DecodingKey>>,
    missing: Cache<String, ()>,
    client: Client,
    jwks_uri: Url,
}

impl JwksProvider {
    pub fn new(jwks_uri: Url, ttl: Duration) -> Result<Self, AuthSetupError> {
        Ok(Self {
            cache: Cache::builder()
                .max_capacity(MAX_CACHED_KEYS)
                .time_to_live(ttl)
                .build(),
            missing: Cache::builder()
                .max_capacity(MAX_CACHED_KEYS)
                .time_to_live(MISSING_KID_TTL)
                .build(),
            client: Client::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent(concat!("coffeeshop/", env!("CARGO_PKG_VERSION")))
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            jwks_uri,
        })
    }

    /// Location of the key set.
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Returns the decoding key for `kid`.
    ///
    /// A key absent from the freshly fetched set is reported as an invalid
    /// token, as is a failure to reach the identity provider. Unknown ids are
    /// remembered briefly so repeated requests do not refetch the set.
    pub async fn get_key(&self, kid: &str) -> AuthResult<Arc<DecodingKey>> {
        if let Some(key) = self.cache.get(kid) {
            return Ok(key);
        }
        if self.missing.contains_key(kid) {
            return Err(unknown_key());
        }

        self.refresh().await?;

        match self.cache.get(kid) {
            Some(key) => Ok(key),
            None => {
                debug!(kid = %kid, "Key id not in JWKS");
                self.missing.insert(kid.to_string(), ());
                Err(unknown_key())
            }
        }
    }

    async fn refresh(&self) -> AuthResult<()> {
        debug!(uri = %self.jwks_uri, "Fetching JWKS");

        let unavailable = |reason: String| {
            warn!(uri = %self.jwks_uri, reason = %reason, "JWKS fetch failed");
            AuthError::invalid_token("Unable to fetch signing keys.")
        };

        let response = self
            .client
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unavailable(e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len > MAX_JWKS_BYTES {
                return Err(unavailable(format!("response too large: {len} bytes")));
            }
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid JWKS document: {e}")))?;

        let mut loaded = 0usize;
        for key in set.keys {
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };
            if key.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => {
                    self.missing.invalidate(&kid);
                    self.cache.insert(kid, Arc::new(decoding_key));
                    loaded += 1;
                }
                Err(err) => warn!(kid = %kid, error = %err, "Skipping unusable JWK"),
            }
        }

        debug!(keys = loaded, "JWKS refreshed");
        Ok(())
    }
}

fn unknown_key() -> AuthError {
    AuthError::invalid_token("Unable to find the appropriate key.")
}
