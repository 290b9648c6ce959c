//! coffeeshop-storage: Storage abstraction layer
//!
//! This crate provides persistence for the drinks catalog, including:
//! - DrinkStore trait for storage operations
//! - In-memory implementation for testing
//! - PostgreSQL implementation for production
//! - SQLite implementation for single-node deployments
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             coffeeshop-storage              │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DrinkStore trait definition  │
//! │  memory.rs   - In-memory implementation     │
//! │  postgres.rs - PostgreSQL implementation    │
//! │  sqlite.rs   - SQLite implementation        │
//! │  timeout.rs  - Query timeouts and metrics   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod traits;

mod timeout;

// Re-export commonly used types
pub use error::{HealthStatus, PoolStats, StorageError, StorageResult};
pub use memory::MemoryDrinkStore;
pub use postgres::{PostgresConfig, PostgresDrinkStore};
pub use sqlite::{SqliteConfig, SqliteDrinkStore};
pub use traits::DrinkStore;
