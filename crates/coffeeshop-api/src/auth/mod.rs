//! Bearer token verification.
//!
//! Protected handlers call [`TokenVerifier::authorize`] before touching the
//! store. Tokens are JWTs signed either by an identity provider publishing a
//! JSON Web Key Set (RS256) or with a shared secret (HS256).

mod config;
mod error;
mod jwks;
mod verifier;

pub use config::{AuthConfig, SigningAuthority};
pub use error::{AuthError, AuthResult, AuthSetupError};
pub use jwks::JwksProvider;
pub use verifier::{Claims, TokenVerifier};
