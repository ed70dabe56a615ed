//! Runtime AI settings: the active model id and the generator system prompt.
//!
//! Resolution order is store → environment → built-in default. Nothing is
//! cached, every request re-reads the store. Store failures are logged and
//! treated as "not set" so generation keeps working on the fallbacks.

pub mod handlers;
pub mod store;

use serde::Serialize;
use tracing::warn;

use crate::config::AiDefaults;
use crate::errors::AppError;
use crate::generation::prompts::DEFAULT_SYSTEM_PROMPT;
use store::{ConfigKey, ConfigStore};

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-v3.2-exp";

const FREE_SUFFIX: &str = ":free";

/// Model ids retired by the gateway, mapped to their replacement.
const MODEL_ALIASES: &[(&str, &str)] = &[("deepseek/deepseek-v3.2", "deepseek/deepseek-v3.2-exp")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingSource {
    Db,
    Env,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub value: String,
    pub source: SettingSource,
}

/// Strips the legacy `:free` suffix, then remaps retired ids.
/// Anything else passes through untouched, whitespace included.
pub fn normalize_model_id(raw: &str) -> String {
    let base = raw.strip_suffix(FREE_SUFFIX).unwrap_or(raw);
    MODEL_ALIASES
        .iter()
        .find(|(old, _)| *old == base)
        .map(|(_, new)| (*new).to_string())
        .unwrap_or_else(|| base.to_string())
}

async fn read_value(store: &dyn ConfigStore, key: ConfigKey) -> Option<String> {
    match store.get(key).await {
        Ok(row) => row.map(|r| r.value).filter(|v| !v.trim().is_empty()),
        Err(e) => {
            warn!("Failed to read {} from config store, using fallback: {e:#}", key.as_str());
            None
        }
    }
}

pub async fn resolve_model(store: &dyn ConfigStore, defaults: &AiDefaults) -> ResolvedSetting {
    if let Some(value) = read_value(store, ConfigKey::AiModel).await {
        return ResolvedSetting {
            value: normalize_model_id(&value),
            source: SettingSource::Db,
        };
    }
    match &defaults.model {
        Some(env_model) => ResolvedSetting {
            value: normalize_model_id(env_model),
            source: SettingSource::Env,
        },
        None => ResolvedSetting {
            value: DEFAULT_MODEL.to_string(),
            source: SettingSource::Default,
        },
    }
}

pub async fn resolve_system_prompt(
    store: &dyn ConfigStore,
    defaults: &AiDefaults,
) -> ResolvedSetting {
    if let Some(value) = read_value(store, ConfigKey::SystemPrompt).await {
        return ResolvedSetting {
            value,
            source: SettingSource::Db,
        };
    }
    match &defaults.system_prompt {
        Some(prompt) => ResolvedSetting {
            value: prompt.clone(),
            source: SettingSource::Env,
        },
        None => ResolvedSetting {
            value: DEFAULT_SYSTEM_PROMPT.to_string(),
            source: SettingSource::Default,
        },
    }
}

/// Validates and stores a new model id. The normalized id is what gets persisted.
pub async fn save_model(store: &dyn ConfigStore, raw: &str) -> Result<String, AppError> {
    let model = normalize_model_id(raw.trim());
    if model.is_empty() {
        return Err(AppError::Validation("model is required".to_string()));
    }
    if model.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "model must not contain whitespace".to_string(),
        ));
    }
    let row = store.upsert(ConfigKey::AiModel, &model).await?;
    Ok(row.value)
}

pub async fn save_system_prompt(store: &dyn ConfigStore, raw: &str) -> Result<String, AppError> {
    let prompt = raw.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt is required".to_string()));
    }
    let row = store.upsert(ConfigKey::SystemPrompt, prompt).await?;
    Ok(row.value)
}

#[cfg(test)]
mod tests {
    use super::store::MemoryConfigStore;
    use super::*;

    #[test]
    fn test_normalize_model_id_table() {
        let cases = [
            ("deepseek/deepseek-v3.2", "deepseek/deepseek-v3.2-exp"),
            ("deepseek/deepseek-v3.2:free", "deepseek/deepseek-v3.2-exp"),
            ("openai/gpt-4o:free", "openai/gpt-4o"),
            ("openai/gpt-4o", "openai/gpt-4o"),
            ("deepseek/deepseek-v3.2-exp", "deepseek/deepseek-v3.2-exp"),
            ("anthropic/claude-sonnet-4.5", "anthropic/claude-sonnet-4.5"),
            ("x/free-model", "x/free-model"),
            (" openai/gpt-4o ", " openai/gpt-4o "),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_model_id(input), expected, "input: {input}");
        }
    }

    #[tokio::test]
    async fn test_save_model_trims_before_normalizing() {
        let store = MemoryConfigStore::default();
        let saved = save_model(&store, "  openai/gpt-4o:free \n").await.unwrap();
        assert_eq!(saved, "openai/gpt-4o");
    }

    #[tokio::test]
    async fn test_resolve_model_falls_back_to_default() {
        let store = MemoryConfigStore::default();
        let resolved = resolve_model(&store, &AiDefaults::default()).await;
        assert_eq!(resolved.value, DEFAULT_MODEL);
        assert_eq!(resolved.source, SettingSource::Default);
    }

    #[tokio::test]
    async fn test_resolve_model_uses_env_before_default() {
        let store = MemoryConfigStore::default();
        let defaults = AiDefaults {
            model: Some("qwen/qwen3-coder:free".to_string()),
            system_prompt: None,
        };
        let resolved = resolve_model(&store, &defaults).await;
        assert_eq!(resolved.value, "qwen/qwen3-coder");
        assert_eq!(resolved.source, SettingSource::Env);
    }

    #[tokio::test]
    async fn test_save_then_resolve_returns_normalized_db_value() {
        let store = MemoryConfigStore::default();
        let saved = save_model(&store, "openai/gpt-4o:free").await.unwrap();
        assert_eq!(saved, "openai/gpt-4o");

        let resolved = resolve_model(&store, &AiDefaults::default()).await;
        assert_eq!(resolved.value, "openai/gpt-4o");
        assert_eq!(resolved.source, SettingSource::Db);
    }

    #[tokio::test]
    async fn test_resolve_normalizes_legacy_stored_value() {
        let store = MemoryConfigStore::default();
        store
            .upsert(ConfigKey::AiModel, "deepseek/deepseek-v3.2")
            .await
            .unwrap();
        let resolved = resolve_model(&store, &AiDefaults::default()).await;
        assert_eq!(resolved.value, "deepseek/deepseek-v3.2-exp");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_without_writes() {
        let store = MemoryConfigStore::default();
        save_model(&store, "mistralai/devstral").await.unwrap();
        let first = resolve_model(&store, &AiDefaults::default()).await;
        let second = resolve_model(&store, &AiDefaults::default()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let store = MemoryConfigStore::default();
        save_model(&store, "openai/gpt-4o").await.unwrap();
        store.fail();
        let defaults = AiDefaults {
            model: Some("env/model".to_string()),
            system_prompt: None,
        };
        let resolved = resolve_model(&store, &defaults).await;
        assert_eq!(resolved.value, "env/model");
        assert_eq!(resolved.source, SettingSource::Env);
    }

    #[tokio::test]
    async fn test_save_model_rejects_blank() {
        let store = MemoryConfigStore::default();
        assert!(matches!(
            save_model(&store, "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            save_model(&store, ":free").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_system_prompt_default_and_override() {
        let store = MemoryConfigStore::default();
        let resolved = resolve_system_prompt(&store, &AiDefaults::default()).await;
        assert_eq!(resolved.source, SettingSource::Default);
        assert_eq!(resolved.value, DEFAULT_SYSTEM_PROMPT);

        save_system_prompt(&store, "  Only output Svelte.  ").await.unwrap();
        let resolved = resolve_system_prompt(&store, &AiDefaults::default()).await;
        assert_eq!(resolved.value, "Only output Svelte.");
        assert_eq!(resolved.source, SettingSource::Db);
    }
}
