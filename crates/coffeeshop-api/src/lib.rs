//! coffeeshop-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints for drinks via Axum
//! - Bearer token verification (JWT against a JWKS or a shared secret)
//! - Middleware (request ID, logging, metrics, CORS)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               coffeeshop-api                │
//! ├─────────────────────────────────────────────┤
//! │  http/          - Routes, handlers, errors  │
//! │  auth/          - Token verifier, JWKS      │
//! │  middleware/    - Request ID, logs, metrics │
//! │  observability/ - Logging & Prometheus      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod http;
pub mod middleware;
pub mod observability;
