use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub url: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price_cents: Option<i32>,
    pub sequence: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
