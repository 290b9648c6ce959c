//! Bearer token verification and permission checks.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use coffeeshop_domain::Permission;

use super::config::{AuthConfig, SigningAuthority};
use super::error::{AuthError, AuthResult, AuthSetupError};
use super::jwks::JwksProvider;

/// Decoded token claims handed to protected handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience, a string or an array of strings.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    /// Permissions granted to the caller, e.g. `post:drinks`.
    ///
    /// A claim that is not a list of strings grants nothing.
    #[serde(default, deserialize_with = "permissions_or_none")]
    pub permissions: Option<Vec<String>>,
}

fn permissions_or_none<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl Claims {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission.as_str()))
    }
}

enum KeySource {
    Jwks(JwksProvider),
    Secret(Arc<DecodingKey>),
}

/// Verifies bearer tokens against the configured signing authority.
///
/// The only state is the signing-key cache; there is no revocation list and
/// no token refresh.
pub struct TokenVerifier {
    keys: KeySource,
    algorithm: Algorithm,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_secs: u64,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Result<Self, AuthSetupError> {
        let (keys, algorithm) = match config.authority {
            SigningAuthority::Jwks { jwks_uri } => (
                KeySource::Jwks(JwksProvider::new(jwks_uri, config.jwks_cache_ttl)?),
                Algorithm::RS256,
            ),
            SigningAuthority::SharedSecret { secret } => (
                KeySource::Secret(Arc::new(DecodingKey::from_secret(secret.as_bytes()))),
                Algorithm::HS256,
            ),
        };

        Ok(Self {
            keys,
            algorithm,
            issuer: config.issuer,
            audience: config.audience,
            leeway_secs: config.leeway.as_secs(),
        })
    }

    /// Extracts the bearer token from request headers.
    pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader {
                description: "Authorization header must be bearer token.",
            })?;

        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => {
                Err(AuthError::MalformedHeader {
                    description: "Authorization header must start with \"Bearer\".",
                })
            }
            (Some(_), None, _) | (None, _, _) => Err(AuthError::MalformedHeader {
                description: "Token not found.",
            }),
            (Some(_), Some(token), None) => Ok(token),
            (Some(_), Some(_), Some(_)) => Err(AuthError::MalformedHeader {
                description: "Authorization header must be bearer token.",
            }),
        }
    }

    /// Checks the request's bearer token and the permission a route requires.
    ///
    /// Every denial is logged with its reason code; token material never is.
    pub async fn authorize(&self, headers: &HeaderMap, required: Permission) -> AuthResult<Claims> {
        let result = match Self::bearer_token(headers) {
            Ok(token) => self.verify(token, required).await,
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            warn!(
                code = e.code(),
                status = e.status().as_u16(),
                permission = %required,
                "Request denied"
            );
            metrics::counter!("coffeeshop_auth_denials_total", "code" => e.code()).increment(1);
        }
        result
    }

    /// Verifies `token` and confirms it grants `required`.
    pub async fn verify(&self, token: &str, required: Permission) -> AuthResult<Claims> {
        let claims = self.decode(token).await?;
        if !claims.has_permission(required) {
            return Err(AuthError::InsufficientPermission { required });
        }
        Ok(claims)
    }

    async fn decode(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token)
            .map_err(|_| AuthError::invalid_token("Unable to parse authentication token."))?;

        if header.alg != self.algorithm {
            return Err(AuthError::invalid_token(format!(
                "Invalid header. Use an {:?} signed JWT Access Token.",
                self.algorithm
            )));
        }

        let key = match &self.keys {
            KeySource::Secret(key) => Arc::clone(key),
            KeySource::Jwks(provider) => {
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| AuthError::invalid_token("Authorization malformed."))?;
                provider.get_key(kid).await?
            }
        };

        let data = decode::<Claims>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
                _ => AuthError::invalid_token("Unable to parse authentication token."),
            }
        })?;

        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}
