//! SQLite storage implementation.
//!
//! Suited to single-node deployments and local development. An in-memory
//! database (`sqlite::memory:`) is pinned to a single pooled connection,
//! since every SQLite connection would otherwise open its own empty database.

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use coffeeshop_domain::{Drink, NewDrink, Recipe};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, instrument};

use crate::error::{HealthStatus, PoolStats, StorageError, StorageResult};
use crate::traits::DrinkStore;

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
const CREATE_DRINKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(80) NOT NULL UNIQUE,
        recipe TEXT NOT NULL
    )
"#;

fn row_to_drink(row: SqliteRow) -> StorageResult<Drink> {
    let read_err = |e: sqlx::Error| StorageError::QueryError {
        message: format!("Failed to read drink row: {e}"),
    };
    let id: i64 = row.try_get("id").map_err(read_err)?;
    let title: String = row.try_get("title").map_err(read_err)?;
    let recipe: String = row.try_get("recipe").map_err(read_err)?;

    Ok(Drink {
        id,
        title,
        recipe: Recipe::from_stored(id, &recipe)?,
    })
}

fn encode_recipe(drink: &NewDrink) -> StorageResult<String> {
    drink
        .recipe
        .to_stored()
        .map_err(|e| StorageError::SerializationError {
            message: format!("Failed to serialize recipe: {e}"),
        })
}

fn map_write_error(e: sqlx::Error, title: &str, context: &str) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return StorageError::DuplicateTitle {
                title: title.to_string(),
            };
        }
    }
    StorageError::QueryError {
        message: format!("Failed to {context}: {e}"),
    }
}

/// SQLite configuration options.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL, e.g. `sqlite://coffeeshop.db` or `sqlite::memory:`.
    pub database_url: String,
    /// Maximum number of connections in the pool (forced to 1 for in-memory databases).
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Query timeout in seconds.
    pub query_timeout_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://coffeeshop.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl SqliteConfig {
    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// SQLite implementation of DrinkStore.
pub struct SqliteDrinkStore {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteDrinkStore {
    /// Creates a new SQLite drink store with the given configuration.
    ///
    /// The database file is created if it does not exist.
    #[instrument(skip(config))]
    pub async fn from_config(config: &SqliteConfig) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StorageError::ConnectionError {
                message: format!("invalid sqlite url: {e}"),
            })?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));
        pool_options = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionError {
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    /// Creates a new SQLite drink store from a database URL.
    pub async fn from_url(database_url: &str) -> StorageResult<Self> {
        let config = SqliteConfig {
            database_url: database_url.to_string(),
            ..Default::default()
        };
        Self::from_config(&config).await
    }

    /// Opens a fresh in-memory database with the schema applied.
    pub async fn in_memory() -> StorageResult<Self> {
        let store = Self::from_url("sqlite::memory:").await?;
        store.run_migrations().await?;
        Ok(store)
    }

    async fn execute_with_timeout<T, F>(&self, operation: &str, future: F) -> StorageResult<T>
    where
        F: std::future::Future<Output = StorageResult<T>>,
    {
        crate::timeout::execute_with_timeout("sqlite", operation, self.query_timeout, future).await
    }

    /// Creates the drinks table if it does not exist.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(CREATE_DRINKS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError {
                message: format!("Failed to create drinks table: {e}"),
            })?;
        debug!("SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl DrinkStore for SqliteDrinkStore {
    #[instrument(skip(self))]
    async fn list_drinks(&self) -> StorageResult<Vec<Drink>> {
        let rows = self
            .execute_with_timeout("list_drinks", async {
                sqlx::query("SELECT id, title, recipe FROM drinks ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| StorageError::QueryError {
                        message: format!("Failed to list drinks: {e}"),
                    })
            })
            .await?;

        rows.into_iter().map(row_to_drink).collect()
    }

    #[instrument(skip(self))]
    async fn get_drink(&self, id: i64) -> StorageResult<Drink> {
        let row = self
            .execute_with_timeout("get_drink", async {
                sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StorageError::QueryError {
                        message: format!("Failed to get drink: {e}"),
                    })
            })
            .await?;

        row.map(row_to_drink)
            .unwrap_or(Err(StorageError::DrinkNotFound { id }))
    }

    #[instrument(skip(self, drink), fields(title = %drink.title))]
    async fn create_drink(&self, drink: NewDrink) -> StorageResult<Drink> {
        let recipe = encode_recipe(&drink)?;

        let id: i64 = self
            .execute_with_timeout("create_drink", async {
                sqlx::query_scalar("INSERT INTO drinks (title, recipe) VALUES (?1, ?2) RETURNING id")
                    .bind(&drink.title)
                    .bind(&recipe)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| map_write_error(e, &drink.title, "create drink"))
            })
            .await?;

        Ok(Drink::from_new(id, drink))
    }

    #[instrument(skip(self, drink), fields(drink_id = id))]
    async fn update_drink(&self, id: i64, drink: NewDrink) -> StorageResult<Drink> {
        let recipe = encode_recipe(&drink)?;

        let updated = self
            .execute_with_timeout("update_drink", async {
                sqlx::query("UPDATE drinks SET title = ?2, recipe = ?3 WHERE id = ?1")
                    .bind(id)
                    .bind(&drink.title)
                    .bind(&recipe)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| map_write_error(e, &drink.title, "update drink"))
            })
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::DrinkNotFound { id });
        }

        Ok(Drink::from_new(id, drink))
    }

    #[instrument(skip(self))]
    async fn delete_drink(&self, id: i64) -> StorageResult<i64> {
        let result = self
            .execute_with_timeout("delete_drink", async {
                sqlx::query("DELETE FROM drinks WHERE id = ?1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::QueryError {
                        message: format!("Failed to delete drink: {e}"),
                    })
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::DrinkNotFound { id });
        }

        Ok(id)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();

        self.execute_with_timeout("health_check", async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::HealthCheckFailed {
                    message: format!("database ping failed: {e}"),
                })
        })
        .await?;

        let total_connections = self.pool.size();
        let idle_connections = self.pool.num_idle() as u32;

        Ok(HealthStatus {
            healthy: true,
            latency: start.elapsed(),
            pool_stats: Some(PoolStats {
                active_connections: total_connections.saturating_sub(idle_connections),
                idle_connections,
                max_connections: self.pool.options().get_max_connections(),
            }),
            message: Some("sqlite".to_string()),
        })
    }

    #[instrument(skip(self))]
    async fn reset(&self) -> StorageResult<Drink> {
        let seed = NewDrink::seed();
        let recipe = encode_recipe(&seed)?;
        let query_err = |context: &'static str| {
            move |e: sqlx::Error| StorageError::QueryError {
                message: format!("Failed to {context}: {e}"),
            }
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_err("begin reset transaction"))?;

        sqlx::query("DROP TABLE IF EXISTS drinks")
            .execute(&mut *tx)
            .await
            .map_err(query_err("drop drinks table"))?;
        sqlx::query(CREATE_DRINKS_TABLE)
            .execute(&mut *tx)
            .await
            .map_err(query_err("create drinks table"))?;
        let id: i64 =
            sqlx::query_scalar("INSERT INTO drinks (title, recipe) VALUES (?1, ?2) RETURNING id")
                .bind(&seed.title)
                .bind(&recipe)
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err("insert seed drink"))?;

        tx.commit()
            .await
            .map_err(query_err("commit reset transaction"))?;

        debug!(drink_id = id, "Drinks table reset");
        Ok(Drink::from_new(id, seed))
    }
}
