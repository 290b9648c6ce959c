//! Token verification errors.

use axum::http::StatusCode;
use thiserror::Error;

use coffeeshop_domain::Permission;

/// Reason a bearer token was not accepted for a request.
///
/// Each variant maps to an HTTP status, a stable machine code used in logs
/// and metrics, and a human description returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected.")]
    MissingToken,

    /// The header is present but is not `Bearer <token>`.
    #[error("{description}")]
    MalformedHeader { description: &'static str },

    /// The token verified but its `exp` is in the past.
    #[error("Token expired.")]
    TokenExpired,

    /// Issuer, audience or a required claim did not match.
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    /// The token could not be decoded or its signature did not verify.
    #[error("{description}")]
    InvalidToken { description: String },

    /// The token is valid but lacks the permission the route requires.
    #[error("Permission not found.")]
    InsufficientPermission { required: Permission },
}

impl AuthError {
    pub(crate) fn invalid_token(description: impl Into<String>) -> Self {
        AuthError::InvalidToken {
            description: description.into(),
        }
    }

    /// HTTP status for this denial.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermission { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "authorization_header_missing",
            AuthError::MalformedHeader { .. } => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::InvalidToken { .. } => "invalid_token",
            AuthError::InsufficientPermission { .. } => "unauthorized",
        }
    }

    /// Human-readable description, surfaced as the response message.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Result type for token verification.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while building a [`TokenVerifier`](super::TokenVerifier) at startup.
#[derive(Debug, Error)]
pub enum AuthSetupError {
    #[error("no signing authority configured: set auth.domain, auth.jwks_uri or auth.shared_secret")]
    NoSigningAuthority,

    #[error("invalid JWKS URI '{uri}': {message}")]
    InvalidJwksUri { uri: String, message: String },

    #[error("failed to build JWKS HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
