//! DrinkStore trait definition.

use async_trait::async_trait;
use coffeeshop_domain::{Drink, NewDrink};

use crate::error::{HealthStatus, StorageResult};

/// Abstract storage interface for drinks.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations. Title uniqueness is enforced by the store.
#[async_trait]
pub trait DrinkStore: Send + Sync + 'static {
    /// Lists every drink in ascending id order.
    async fn list_drinks(&self) -> StorageResult<Vec<Drink>>;

    /// Gets a drink by ID.
    async fn get_drink(&self, id: i64) -> StorageResult<Drink>;

    /// Inserts a new drink and returns it with its assigned ID.
    ///
    /// Fails with `DuplicateTitle` if the title is taken.
    async fn create_drink(&self, drink: NewDrink) -> StorageResult<Drink>;

    /// Replaces the title and recipe of an existing drink.
    ///
    /// Fails with `DrinkNotFound` if the ID does not exist and with
    /// `DuplicateTitle` if another drink already has the new title.
    async fn update_drink(&self, id: i64, drink: NewDrink) -> StorageResult<Drink>;

    /// Deletes a drink, returning the deleted ID.
    async fn delete_drink(&self, id: i64) -> StorageResult<i64>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Drops all drinks, recreates the schema and inserts the seed drink.
    ///
    /// This is an administrative operation and never runs implicitly.
    async fn reset(&self) -> StorageResult<Drink>;
}
