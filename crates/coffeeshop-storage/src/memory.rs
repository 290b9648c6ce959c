//! In-memory storage implementation for testing.
//!
//! A single lock guards both the drinks and the id counter so that the
//! title uniqueness check and the insert happen atomically.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use coffeeshop_domain::{Drink, NewDrink};
use parking_lot::RwLock;
use tracing::instrument;

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::DrinkStore;

#[derive(Debug)]
struct MemoryState {
    next_id: i64,
    drinks: BTreeMap<i64, Drink>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            next_id: 1,
            drinks: BTreeMap::new(),
        }
    }
}

impl MemoryState {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.drinks
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
    }
}

/// In-memory implementation of DrinkStore.
///
/// Ids are assigned from a monotonically increasing counter and are never
/// reused, matching the behavior of the SQL backends.
#[derive(Debug, Default)]
pub struct MemoryDrinkStore {
    state: RwLock<MemoryState>,
}

impl MemoryDrinkStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of stored drinks.
    pub fn len(&self) -> usize {
        self.state.read().drinks.len()
    }

    /// Returns true if no drinks are stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().drinks.is_empty()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    async fn list_drinks(&self) -> StorageResult<Vec<Drink>> {
        Ok(self.state.read().drinks.values().cloned().collect())
    }

    async fn get_drink(&self, id: i64) -> StorageResult<Drink> {
        self.state
            .read()
            .drinks
            .get(&id)
            .cloned()
            .ok_or(StorageError::DrinkNotFound { id })
    }

    #[instrument(skip(self, drink), fields(title = %drink.title))]
    async fn create_drink(&self, drink: NewDrink) -> StorageResult<Drink> {
        let mut state = self.state.write();
        if state.title_taken(&drink.title, None) {
            return Err(StorageError::DuplicateTitle { title: drink.title });
        }

        let id = state.next_id;
        state.next_id += 1;
        let drink = Drink::from_new(id, drink);
        state.drinks.insert(id, drink.clone());
        Ok(drink)
    }

    #[instrument(skip(self, drink), fields(drink_id = id))]
    async fn update_drink(&self, id: i64, drink: NewDrink) -> StorageResult<Drink> {
        let mut state = self.state.write();
        if !state.drinks.contains_key(&id) {
            return Err(StorageError::DrinkNotFound { id });
        }
        if state.title_taken(&drink.title, Some(id)) {
            return Err(StorageError::DuplicateTitle { title: drink.title });
        }

        let updated = Drink::from_new(id, drink);
        state.drinks.insert(id, updated.clone());
        Ok(updated)
    }

    #[instrument(skip(self), fields(drink_id = id))]
    async fn delete_drink(&self, id: i64) -> StorageResult<i64> {
        self.state
            .write()
            .drinks
            .remove(&id)
            .map(|d| d.id)
            .ok_or(StorageError::DrinkNotFound { id })
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();
        let _ = self.state.read().drinks.len();
        Ok(HealthStatus {
            healthy: true,
            latency: start.elapsed(),
            pool_stats: None,
            message: Some("memory".to_string()),
        })
    }

    async fn reset(&self) -> StorageResult<Drink> {
        let mut state = self.state.write();
        *state = MemoryState::default();

        let seed = Drink::from_new(state.next_id, NewDrink::seed());
        state.next_id += 1;
        state.drinks.insert(seed.id, seed.clone());
        Ok(seed)
    }
}
