//! Storage error types.

use std::time::Duration;

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Drink not found.
    #[error("drink not found: {id}")]
    DrinkNotFound { id: i64 },

    /// Another drink already uses this title.
    #[error("drink title already exists: {title}")]
    DuplicateTitle { title: String },

    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Database query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Query exceeded its time budget.
    #[error("query timeout: {operation} exceeded {timeout:?}")]
    QueryTimeout {
        operation: String,
        timeout: Duration,
    },

    /// Health check failed.
    #[error("health check failed: {message}")]
    HealthCheckFailed { message: String },

    /// Serialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Connection pool statistics reported by SQL backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
}

/// Result of a storage health check.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the backend answered.
    pub healthy: bool,
    /// Round-trip latency of the check.
    pub latency: Duration,
    /// Pool statistics, when the backend has a pool.
    pub pool_stats: Option<PoolStats>,
    /// Backend name or diagnostic message.
    pub message: Option<String>,
}

impl From<coffeeshop_domain::DomainError> for StorageError {
    fn from(err: coffeeshop_domain::DomainError) -> Self {
        StorageError::SerializationError {
            message: err.to_string(),
        }
    }
}
