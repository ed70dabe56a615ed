use std::sync::Arc;

use sqlx::PgPool;

use crate::ai_config::store::ConfigStore;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub config: Config,
    /// AI settings store. Default: `PgConfigStore` over `db`.
    pub config_store: Arc<dyn ConfigStore>,
    /// Per-IP limiter for the generation endpoints. Process-local.
    pub rate_limiter: Arc<RateLimiter>,
}
