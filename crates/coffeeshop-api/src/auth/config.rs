//! Token verifier configuration.

use std::time::Duration;

use coffeeshop_server::AuthSettings;
use url::Url;

use super::error::AuthSetupError;

/// Where signing keys come from.
#[derive(Clone)]
pub enum SigningAuthority {
    /// RS256 keys published by an identity provider as a JSON Web Key Set.
    Jwks { jwks_uri: Url },
    /// A shared HS256 secret, for local development and tests.
    SharedSecret { secret: String },
}

impl std::fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningAuthority::Jwks { jwks_uri } => f
                .debug_struct("Jwks")
                .field("jwks_uri", &jwks_uri.as_str())
                .finish(),
            SigningAuthority::SharedSecret { .. } => f
                .debug_struct("SharedSecret")
                .field("secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Resolved settings for a [`TokenVerifier`](super::TokenVerifier).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub authority: SigningAuthority,
    /// Expected `iss`; not checked when `None`.
    pub issuer: Option<String>,
    /// Expected `aud`; not checked when `None`.
    pub audience: Option<String>,
    /// Clock skew tolerated when checking `exp`.
    pub leeway: Duration,
    /// Lifetime of cached JWKS keys.
    pub jwks_cache_ttl: Duration,
}

impl AuthConfig {
    /// Verifies HS256 tokens signed with `secret`.
    pub fn shared_secret(secret: impl Into<String>) -> Self {
        Self::with_authority(SigningAuthority::SharedSecret {
            secret: secret.into(),
        })
    }

    /// Verifies RS256 tokens against the key set at `jwks_uri`.
    pub fn jwks(jwks_uri: Url) -> Self {
        Self::with_authority(SigningAuthority::Jwks { jwks_uri })
    }

    fn with_authority(authority: SigningAuthority) -> Self {
        Self {
            authority,
            issuer: None,
            audience: None,
            leeway: Duration::from_secs(60),
            jwks_cache_ttl: Duration::from_secs(3600),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Builds the verifier configuration from loaded settings.
    ///
    /// An identity provider takes precedence over a shared secret. When a
    /// `domain` is given, the JWKS location defaults to
    /// `https://<domain>/.well-known/jwks.json` and the issuer to
    /// `https://<domain>/`.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthSetupError> {
        let domain = non_blank(&settings.domain).map(normalize_domain);

        let authority = if let Some(uri) = non_blank(&settings.jwks_uri) {
            SigningAuthority::Jwks {
                jwks_uri: parse_jwks_uri(uri)?,
            }
        } else if let Some(domain) = &domain {
            SigningAuthority::Jwks {
                jwks_uri: parse_jwks_uri(&format!("https://{domain}/.well-known/jwks.json"))?,
            }
        } else if let Some(secret) = non_blank(&settings.shared_secret) {
            SigningAuthority::SharedSecret {
                secret: secret.to_string(),
            }
        } else {
            return Err(AuthSetupError::NoSigningAuthority);
        };

        let issuer = non_blank(&settings.issuer)
            .map(str::to_string)
            .or_else(|| domain.as_ref().map(|d| format!("https://{d}/")));

        Ok(Self {
            authority,
            issuer,
            audience: non_blank(&settings.audience).map(str::to_string),
            leeway: Duration::from_secs(settings.leeway_secs),
            jwks_cache_ttl: Duration::from_secs(settings.jwks_cache_ttl_secs),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// Accept "tenant.auth0.com", "https://tenant.auth0.com" and a trailing slash.
fn normalize_domain(domain: &str) -> String {
    domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

fn parse_jwks_uri(uri: &str) -> Result<Url, AuthSetupError> {
    let url = Url::parse(uri).map_err(|e| AuthSetupError::InvalidJwksUri {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(AuthSetupError::InvalidJwksUri {
            uri: uri.to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}
