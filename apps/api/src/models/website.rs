use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebsiteRow {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub sequence: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
