//! Key-value persistence for the AI settings.
//!
//! `AppState` holds an `Arc<dyn ConfigStore>`; Postgres in production, an
//! in-memory map in tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::ai_config::ConfigEntryRow;

/// Fixed ids of the singleton config rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    AiModel,
    SystemPrompt,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::AiModel => "ai_model",
            ConfigKey::SystemPrompt => "system_prompt",
        }
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: ConfigKey) -> Result<Option<ConfigEntryRow>>;

    /// Last-write-wins upsert.
    async fn upsert(&self, key: ConfigKey, value: &str) -> Result<ConfigEntryRow>;
}

pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn get(&self, key: ConfigKey) -> Result<Option<ConfigEntryRow>> {
        let row = sqlx::query_as::<_, ConfigEntryRow>("SELECT * FROM ai_config WHERE id = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert(&self, key: ConfigKey, value: &str) -> Result<ConfigEntryRow> {
        let row = sqlx::query_as::<_, ConfigEntryRow>(
            r#"
            INSERT INTO ai_config (id, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
pub use memory::MemoryConfigStore;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct MemoryConfigStore {
        rows: Mutex<HashMap<ConfigKey, ConfigEntryRow>>,
        failing: AtomicBool,
    }

    impl MemoryConfigStore {
        /// Makes every subsequent call return an error.
        pub fn fail(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ConfigStore for MemoryConfigStore {
        async fn get(&self, key: ConfigKey) -> Result<Option<ConfigEntryRow>> {
            self.check()?;
            Ok(self.rows.lock().unwrap().get(&key).cloned())
        }

        async fn upsert(&self, key: ConfigKey, value: &str) -> Result<ConfigEntryRow> {
            self.check()?;
            let row = ConfigEntryRow {
                id: key.as_str().to_string(),
                value: value.to_string(),
                updated_at: Utc::now(),
            };
            self.rows.lock().unwrap().insert(key, row.clone());
            Ok(row)
        }
    }
}
