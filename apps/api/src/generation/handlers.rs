//! Axum route handlers for the generation API.

use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ai_config::{resolve_model, resolve_system_prompt};
use crate::errors::AppError;
use crate::extract::{ApiJson, ClientIp};
use crate::generation::assembler::assemble_messages;
use crate::generation::prompts::{with_output_contract, CHATBOT_SYSTEM_PROMPT};
use crate::generation::relay::{chat_frames_response, plain_text_response};
use crate::generation::suggestions::{
    generate_suggestions, random_seeds, LlmSuggestionSource, MIN_SUGGESTIONS,
};
use crate::llm_client::{ChatMessage, Role};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateComponentRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionsRequest {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

impl GenerateComponentRequest {
    pub fn validate(&self) -> Result<&str, AppError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("prompt cannot be empty".to_string()));
        }
        if self.history.iter().any(|m| m.role == Role::System) {
            return Err(AppError::Validation(
                "history may only contain user and assistant messages".to_string(),
            ));
        }
        Ok(prompt)
    }
}

impl ChatbotRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.messages.last() {
            None => Err(AppError::Validation("messages cannot be empty".to_string())),
            Some(last) if last.role != Role::User => Err(AppError::Validation(
                "the last message must come from the user".to_string(),
            )),
            Some(_) if self.messages.iter().any(|m| m.role == Role::System) => Err(
                AppError::Validation("system messages are not accepted".to_string()),
            ),
            Some(last) if last.content.trim().is_empty() => {
                Err(AppError::Validation("the last message is empty".to_string()))
            }
            Some(_) => Ok(()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate-component
///
/// Streams the generated component as raw text in the file-tag format.
/// Upstream errors before the first byte are relayed with their status.
pub async fn handle_generate_component(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<GenerateComponentRequest>,
) -> Result<Response, AppError> {
    state.rate_limiter.check(&ip)?;
    let prompt = request.validate()?;

    let model = resolve_model(state.config_store.as_ref(), &state.config.ai).await;
    let system = resolve_system_prompt(state.config_store.as_ref(), &state.config.ai).await;
    debug!(
        "Generating for {ip} with model {} ({:?}), prompt from {:?}",
        model.value, model.source, system.source
    );

    let messages = assemble_messages(
        &with_output_contract(&system.value),
        request.context.as_deref(),
        &request.history,
        prompt,
    );

    info!(
        "Requesting component from {} ({} messages)",
        model.value,
        messages.len()
    );
    let deltas = state.llm.stream(&model.value, &messages).await?;
    plain_text_response(deltas, "generate-component")
}

/// POST /api/chatbot
///
/// Line-prefixed stream of content and reasoning frames.
pub async fn handle_chatbot(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<ChatbotRequest>,
) -> Result<Response, AppError> {
    state.rate_limiter.check(&ip)?;
    request.validate()?;

    let model = resolve_model(state.config_store.as_ref(), &state.config.ai).await;

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage::system(CHATBOT_SYSTEM_PROMPT));
    messages.extend(request.messages);

    info!("Chatbot turn with {} messages on {}", messages.len(), model.value);
    let deltas = state.llm.stream(&model.value, &messages).await?;
    chat_frames_response(deltas)
}

/// POST /api/generate-suggestions
///
/// Never fails on LLM errors: missing suggestions are filled with fallbacks.
pub async fn handle_generate_suggestions(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Option<ApiJson<SuggestionsRequest>>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    state.rate_limiter.check(&ip)?;

    let count = body
        .and_then(|ApiJson(req)| req.count)
        .unwrap_or(MIN_SUGGESTIONS);

    let model = resolve_model(state.config_store.as_ref(), &state.config.ai).await;
    let source = LlmSuggestionSource {
        llm: &state.llm,
        model: &model.value,
    };
    let (first_seed, retry_seed) = random_seeds();
    let suggestions = generate_suggestions(&source, count, first_seed, retry_seed).await;

    Ok(Json(SuggestionsResponse { suggestions }))
}
