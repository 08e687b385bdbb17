//! Timebank Server
//!
//! REST API over the time-credit ledger, exchange lifecycle and skill catalog.
//! This is a library crate; the server is started via `start_server()`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{http::Method, middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use timebank_core::constants;
use timebank_core::{Database, MarketConfig};

pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod types;

use error::AppError;

/// Configuration for starting the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (default: 5000).
    pub port: u16,
    pub market: MarketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: constants::server::DEFAULT_PORT,
            market: MarketConfig::default(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// SQLite database path (opened per request).
    pub db_path: Arc<PathBuf>,
    pub config: Arc<MarketConfig>,
}

impl AppState {
    /// Open the database once so the schema exists before serving.
    pub fn new(config: MarketConfig) -> anyhow::Result<Self> {
        let db_path = config.database_path();
        Database::open(&db_path, config.busy_timeout())?;
        Ok(Self {
            db_path: Arc::new(db_path),
            config: Arc::new(config),
        })
    }

    /// Run blocking database work off the async runtime.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database, &MarketConfig) -> timebank_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = Arc::clone(&self.db_path);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            let db = Database::open(&db_path, config.busy_timeout())?;
            f(&db, &config)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Database task failed: {}", e)))?
        .map_err(AppError::from)
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    let protected = routes::api_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::public_router().merge(protected))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Timebank server and block until shutdown.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(config.market)?;

    tracing::info!(
        db = %state.db_path.display(),
        rate_policy = %state.config.rate_policy,
        settlement = %state.config.settlement,
        "Opened marketplace database"
    );
    let app = build_router(state);

    tracing::info!("Timebank server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[cfg(test)]
mod api_tests;
