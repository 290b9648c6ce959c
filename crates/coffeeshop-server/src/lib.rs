//! coffeeshop-server: Service configuration
//!
//! This crate holds the runtime configuration shared by the HTTP layer and
//! the binary:
//! - Layered loading (defaults, YAML file, `COFFEESHOP_` environment)
//! - Validation of the loaded settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             coffeeshop-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;

// Re-exports for convenience
pub use config::{
    AuthSettings, ConfigLoadError, ConfigResult, LoggingSettings, MetricsSettings, ServerConfig,
    ServerSettings, StorageSettings,
};
