//! Application state for HTTP handlers.

use std::sync::Arc;

use coffeeshop_storage::DrinkStore;

use crate::auth::TokenVerifier;

/// Application state shared across all HTTP handlers.
///
/// Built once at startup and never mutated afterwards; handlers receive it
/// through axum's `State` extractor.
///
/// # Type Parameters
///
/// * `S` - The storage backend implementing `DrinkStore`
pub struct AppState<S: DrinkStore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// Verifies bearer tokens on protected routes.
    pub verifier: Arc<TokenVerifier>,
}

impl<S: DrinkStore> AppState<S> {
    pub fn new(storage: Arc<S>, verifier: Arc<TokenVerifier>) -> Self {
        Self { storage, verifier }
    }
}

impl<S: DrinkStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            verifier: Arc::clone(&self.verifier),
        }
    }
}
