//! Coffee shop drinks server.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! coffeeshop --config config.yaml
//!
//! # With environment variables only
//! COFFEESHOP_AUTH__DOMAIN=example.us.auth0.com coffeeshop
//!
//! # Drop, recreate and seed the drinks table before serving
//! coffeeshop --config config.yaml --reset-database
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use coffeeshop_api::auth::{AuthConfig, TokenVerifier};
use coffeeshop_api::http::{
    create_router_with_observability, AppState, MetricsEndpoint, ObservabilityOptions,
};
use coffeeshop_api::middleware::RequestMetrics;
use coffeeshop_api::observability::{init_logging, init_metrics, LoggingConfig, MetricsState};
use coffeeshop_server::ServerConfig;
use coffeeshop_storage::{
    DrinkStore, MemoryDrinkStore, PostgresConfig, PostgresDrinkStore, SqliteConfig,
    SqliteDrinkStore,
};

/// Coffee shop drinks API server
#[derive(Parser, Debug)]
#[command(name = "coffeeshop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Drop and recreate the drinks table, seeded with a single drink, before serving
    #[arg(long)]
    reset_database: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::from_env()?,
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting coffeeshop server");

    let metrics_state = if config.metrics.enabled {
        info!(path = %config.metrics.path, "Metrics enabled");
        Some(init_metrics()?)
    } else {
        None
    };

    let auth_config = AuthConfig::from_settings(&config.auth)?;
    info!(authority = ?auth_config.authority, "Token verification configured");
    let verifier = Arc::new(TokenVerifier::new(auth_config)?);

    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            let storage = Arc::new(MemoryDrinkStore::new());
            prepare(storage.as_ref(), args.reset_database).await?;
            run_server(storage, verifier, &config, metrics_state).await
        }
        "postgres" => {
            let pg_config = PostgresConfig {
                database_url: database_url(&config)?,
                max_connections: config.storage.pool_size,
                min_connections: 1,
                connect_timeout_secs: config.storage.connection_timeout_secs,
                query_timeout_secs: config.storage.query_timeout_secs,
                ..Default::default()
            };

            info!("Connecting to PostgreSQL database");
            let storage = PostgresDrinkStore::from_config(&pg_config).await?;
            storage.run_migrations().await?;
            info!("Database migrations complete");

            let storage = Arc::new(storage);
            prepare(storage.as_ref(), args.reset_database).await?;
            run_server(storage, verifier, &config, metrics_state).await
        }
        "sqlite" => {
            let sqlite_config = SqliteConfig {
                database_url: database_url(&config)?,
                max_connections: config.storage.pool_size,
                connect_timeout_secs: config.storage.connection_timeout_secs,
                query_timeout_secs: config.storage.query_timeout_secs,
            };

            info!("Opening SQLite database");
            let storage = SqliteDrinkStore::from_config(&sqlite_config).await?;
            storage.run_migrations().await?;
            info!("Database migrations complete");

            let storage = Arc::new(storage);
            prepare(storage.as_ref(), args.reset_database).await?;
            run_server(storage, verifier, &config, metrics_state).await
        }
        other => {
            error!("Unknown storage backend: {}", other);
            anyhow::bail!("Unknown storage backend: {}", other);
        }
    }
}

fn database_url(config: &ServerConfig) -> anyhow::Result<String> {
    config.storage.database_url.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "storage.database_url is required for {} backend",
            config.storage.backend
        )
    })
}

/// Runs the administrative reset when requested on the command line.
async fn prepare<S: DrinkStore>(storage: &S, reset_database: bool) -> anyhow::Result<()> {
    if reset_database {
        warn!("Resetting drinks table");
        let seed = storage.reset().await?;
        info!(drink_id = seed.id, title = %seed.title, "Drinks table reset and seeded");
    }
    Ok(())
}

/// Serves HTTP until a shutdown signal arrives.
async fn run_server<S: DrinkStore>(
    storage: Arc<S>,
    verifier: Arc<TokenVerifier>,
    config: &ServerConfig,
    metrics_state: Option<MetricsState>,
) -> anyhow::Result<()> {
    let options = ObservabilityOptions {
        body_limit: config.server.body_limit_bytes,
        metrics_endpoint: metrics_state.map(|state| MetricsEndpoint {
            path: config.metrics.path.clone(),
            state,
        }),
        request_metrics: Arc::new(RequestMetrics::new()),
    };
    let router = create_router_with_observability(AppState::new(storage, verifier), options);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
