mod api;
mod config;
mod db;
mod models;
mod playout;
mod schema;
mod services;

use anyhow::Result;
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load("config.toml")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pseudovision={},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!("Loaded configuration");

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    db::run_migrations(&mut db_pool.get()?)?;
    tracing::info!("Database initialized");

    // Create app state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config),
    };

    // Keep playout timelines topped up in the background
    tokio::spawn(services::rebuild_monitor::run(state.clone()));

    // Get address before moving state
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    // Build router
    let app = Router::new()
        .nest("/api", api::routes())
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
