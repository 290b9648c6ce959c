//! Domain error types for drink operations.

use thiserror::Error;

/// Domain-specific errors for drink payloads and stored recipes.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The drink title is missing, not a string, blank or too long.
    #[error("invalid title: {message}")]
    InvalidTitle { message: String },

    /// The recipe is missing or does not describe a list of ingredients.
    #[error("invalid recipe: {message}")]
    InvalidRecipe { message: String },

    /// A recipe read back from storage could not be decoded.
    #[error("stored recipe for drink {drink_id} is corrupt: {message}")]
    CorruptRecipe { drink_id: i64, message: String },
}

impl DomainError {
    /// Returns true for errors caused by client input rather than stored data.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTitle { .. } | DomainError::InvalidRecipe { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
