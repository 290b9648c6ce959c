//! PostgreSQL storage implementation.

use async_trait::async_trait;
use coffeeshop_domain::{Drink, NewDrink, Recipe};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, instrument};

use crate::error::{HealthStatus, PoolStats, StorageError, StorageResult};
use crate::traits::DrinkStore;

/// Default health check timeout in seconds.
/// Uses a shorter timeout than regular queries since health checks should be fast.
const DEFAULT_HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Default query timeout in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Name of the unique constraint on `drinks.title`.
const TITLE_UNIQUE_CONSTRAINT: &str = "drinks_title_key";

const CREATE_DRINKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(80) NOT NULL,
        recipe TEXT NOT NULL,
        CONSTRAINT drinks_title_key UNIQUE (title)
    )
"#;

/// Parse a database row into a Drink.
fn row_to_drink(row: PgRow) -> StorageResult<Drink> {
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

/// Encode a recipe for the `recipe` column.
fn encode_recipe(drink: &NewDrink) -> StorageResult<String> {
    drink
        .recipe
        .to_stored()
        .map_err(|e| StorageError::SerializationError {
            message: format!("Failed to serialize recipe: {e}"),
        })
}

/// Map a write error, recognising violations of the title constraint.
fn map_write_error(e: sqlx::Error, title: &str, context: &str) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() || db_err.constraint() == Some(TITLE_UNIQUE_CONSTRAINT) {
            return StorageError::DuplicateTitle {
                title: title.to_string(),
            };
        }
    }
    StorageError::QueryError {
        message: format!("Failed to {context}: {e}"),
    }
}

/// PostgreSQL configuration options.
#[derive(Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    pub min_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Query timeout in seconds.
    ///
    /// A query exceeding this duration is abandoned and reported as
    /// `StorageError::QueryTimeout`.
    pub query_timeout_secs: u64,
    /// Timeout for health checks in seconds.
    pub health_check_timeout_secs: u64,
}

// Custom Debug implementation to hide credentials in database_url
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .field("health_check_timeout_secs", &self.health_check_timeout_secs)
            .finish()
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/coffeeshop".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            health_check_timeout_secs: DEFAULT_HEALTH_CHECK_TIMEOUT_SECS,
        }
    }
}

/// PostgreSQL implementation of DrinkStore.
pub struct PostgresDrinkStore {
    pool: PgPool,
    /// Query timeout duration.
    query_timeout: std::time::Duration,
    /// Health check timeout duration.
    health_check_timeout: std::time::Duration,
}

impl PostgresDrinkStore {
    /// Creates a new PostgreSQL drink store from a connection pool.
    ///
    /// Uses the default query timeout of 30 seconds.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(
            pool,
            std::time::Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        )
    }

    /// Creates a new PostgreSQL drink store with a custom query timeout.
    pub fn with_timeout(pool: PgPool, query_timeout: std::time::Duration) -> Self {
        Self {
            pool,
            query_timeout,
            health_check_timeout: std::time::Duration::from_secs(DEFAULT_HEALTH_CHECK_TIMEOUT_SECS),
        }
    }

    /// Creates a new PostgreSQL drink store with the given configuration.
    #[instrument(skip(config))]
    pub async fn from_config(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::ConnectionError {
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            query_timeout: std::time::Duration::from_secs(config.query_timeout_secs),
            health_check_timeout: std::time::Duration::from_secs(config.health_check_timeout_secs),
        })
    }

    /// Creates a new PostgreSQL drink store from a database URL.
    pub async fn from_url(database_url: &str) -> StorageResult<Self> {
        let config = PostgresConfig {
            database_url: database_url.to_string(),
            ..Default::default()
        };
        Self::from_config(&config).await
    }

    /// Wraps an async operation with the query timeout and records metrics.
    ///
    /// # Metrics
    /// - `coffeeshop_storage_query_duration_seconds` - Histogram of query durations
    /// - `coffeeshop_storage_query_timeout_total` - Counter of timeout events
    async fn execute_with_timeout<T, F>(&self, operation: &str, future: F) -> StorageResult<T>
    where
        F: std::future::Future<Output = StorageResult<T>>,
    {
        crate::timeout::execute_with_timeout("postgres", operation, self.query_timeout, future).await
    }

    /// Runs database migrations to create the drinks table.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> StorageResult<()> {
        debug!("Running database migrations");

        sqlx::query(CREATE_DRINKS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError {
                message: format!("Failed to create drinks table: {e}"),
            })?;

        debug!("Database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl DrinkStore for PostgresDrinkStore {
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
                sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StorageError::QueryError {
                        message: format!("Failed to get drink: {e}"),
                    })
            })
            .await?;

        match row {
            Some(row) => row_to_drink(row),
            None => Err(StorageError::DrinkNotFound { id }),
        }
    }

    #[instrument(skip(self, drink), fields(title = %drink.title))]
    async fn create_drink(&self, drink: NewDrink) -> StorageResult<Drink> {
        let recipe = encode_recipe(&drink)?;

        let id: i64 = self
            .execute_with_timeout("create_drink", async {
                sqlx::query_scalar("INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id")
                    .bind(&drink.title)
                    .bind(&recipe)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| map_write_error(e, &drink.title, "create drink"))
            })
            .await?;

        Ok(Drink::from_new(id, drink))
    }

    #[instrument(skip(self, drink), fields(title = %drink.title))]
    async fn update_drink(&self, id: i64, drink: NewDrink) -> StorageResult<Drink> {
        let recipe = encode_recipe(&drink)?;

        let updated = self
            .execute_with_timeout("update_drink", async {
                sqlx::query(
                    r#"
                    UPDATE drinks
                    SET title = $2, recipe = $3
                    WHERE id = $1
                    "#,
                )
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
                sqlx::query("DELETE FROM drinks WHERE id = $1")
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
        let start = std::time::Instant::now();

        // Uses a shorter dedicated timeout since health checks should be fast
        let check_result = tokio::time::timeout(self.health_check_timeout, async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::HealthCheckFailed {
                    message: format!("database ping failed: {e}"),
                })
        })
        .await;

        let latency = start.elapsed();
        match check_result {
            Ok(result) => {
                result?;
            }
            Err(_elapsed) => {
                return Err(StorageError::QueryTimeout {
                    operation: "health_check".to_string(),
                    timeout: self.health_check_timeout,
                });
            }
        }

        // pool.size() returns total connections, so active = size - idle
        let total_connections = self.pool.size();
        let idle_connections = self.pool.num_idle() as u32;

        Ok(HealthStatus {
            healthy: true,
            latency,
            pool_stats: Some(PoolStats {
                active_connections: total_connections.saturating_sub(idle_connections),
                idle_connections,
                max_connections: self.pool.options().get_max_connections(),
            }),
            message: Some("postgresql".to_string()),
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
            sqlx::query_scalar("INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id")
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
