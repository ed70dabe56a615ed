use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Singleton row in `ai_config`, keyed by a fixed id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConfigEntryRow {
    pub id: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
