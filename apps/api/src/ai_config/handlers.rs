use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai_config::{
    resolve_model, resolve_system_prompt, save_model, save_system_prompt, SettingSource,
};
use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub model: String,
    pub source: SettingSource,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct SystemPromptResponse {
    pub prompt: String,
    pub source: SettingSource,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSystemPromptRequest {
    #[serde(default)]
    pub prompt: String,
}

/// GET /api/admin/ai-model
pub async fn handle_get_model(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ModelResponse>, AppError> {
    let resolved = resolve_model(state.config_store.as_ref(), &state.config.ai).await;
    Ok(Json(ModelResponse {
        model: resolved.value,
        source: resolved.source,
    }))
}

/// PATCH /api/admin/ai-model
pub async fn handle_update_model(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<UpdateModelRequest>,
) -> Result<Json<ModelResponse>, AppError> {
    let model = save_model(state.config_store.as_ref(), &req.model).await?;
    info!("Admin {} set active model to {model}", admin.email);
    Ok(Json(ModelResponse {
        model,
        source: SettingSource::Db,
    }))
}

/// GET /api/admin/system-prompt
pub async fn handle_get_system_prompt(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<SystemPromptResponse>, AppError> {
    let resolved = resolve_system_prompt(state.config_store.as_ref(), &state.config.ai).await;
    Ok(Json(SystemPromptResponse {
        prompt: resolved.value,
        source: resolved.source,
    }))
}

/// PATCH /api/admin/system-prompt
pub async fn handle_update_system_prompt(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<UpdateSystemPromptRequest>,
) -> Result<Json<SystemPromptResponse>, AppError> {
    let prompt = save_system_prompt(state.config_store.as_ref(), &req.prompt).await?;
    info!(
        "Admin {} updated the system prompt ({} chars)",
        admin.email,
        prompt.chars().count()
    );
    Ok(Json(SystemPromptResponse {
        prompt,
        source: SettingSource::Db,
    }))
}
