mod ai_config;
mod auth;
mod config;
mod db;
mod directory;
mod errors;
mod extract;
mod generation;
mod llm_client;
mod models;
mod rate_limit;
mod routes;
mod sandbox;
mod state;
mod users;
mod vibecode;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_config::store::PgConfigStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::rate_limit::RateLimiter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shadway API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let llm = LlmClient::new(config.llm_api_key.clone(), config.llm_api_url.clone())?;
    info!("LLM client initialized (gateway: {})", config.llm_api_url);

    // Admin-edited AI settings live in Postgres next to everything else
    let config_store = Arc::new(PgConfigStore::new(db.clone()));

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));
    info!(
        "Generation rate limit: {} requests per {}s per client",
        config.rate_limit_max, config.rate_limit_window_secs
    );

    let state = AppState {
        db,
        llm,
        config: config.clone(),
        config_store,
        rate_limiter,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Peer addresses key the rate limiter when no proxy headers are present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
