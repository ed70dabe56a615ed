//! JSON Feed 1.1 (https://jsonfeed.org/version/1.1) of the newest websites.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::website::WebsiteRow;
use crate::state::AppState;

const FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";
const FEED_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct JsonFeed {
    pub version: &'static str,
    pub title: String,
    pub home_page_url: String,
    pub feed_url: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub content_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub date_published: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

pub fn build_feed(site_url: &str, websites: Vec<WebsiteRow>) -> JsonFeed {
    JsonFeed {
        version: FEED_VERSION,
        title: "Shadway".to_string(),
        home_page_url: site_url.to_string(),
        feed_url: format!("{site_url}/feed.json"),
        description: "Websites and components built with shadcn/ui".to_string(),
        items: websites
            .into_iter()
            .map(|w| FeedItem {
                id: w.id,
                url: w.url,
                title: w.name,
                content_text: w.description,
                image: w.image_url,
                date_published: w.created_at,
                date_modified: w.updated_at,
                tags: w.tags,
            })
            .collect(),
    }
}

/// GET /feed.json
pub async fn handle_json_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let websites = sqlx::query_as::<_, WebsiteRow>(
        "SELECT * FROM websites ORDER BY created_at DESC LIMIT $1",
    )
    .bind(FEED_LIMIT)
    .fetch_all(&state.db)
    .await?;

    let feed = build_feed(&state.config.site_url, websites);
    Ok((
        [(header::CONTENT_TYPE, "application/feed+json; charset=utf-8")],
        Json(feed),
    )
        .into_response())
}
