use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::directory::{
    normalize_tags, optional_text, optional_url, required_text, validate_url, ReorderRequest,
};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::website::WebsiteRow;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WebsiteRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub sequence: Option<i32>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWebsite {
    pub name: String,
    pub url: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub sequence: i32,
    pub featured: bool,
}

impl WebsiteRequest {
    pub fn validate(self) -> Result<NewWebsite, AppError> {
        Ok(NewWebsite {
            name: required_text("name", &self.name)?,
            url: validate_url("url", &self.url)?,
            description: required_text("description", &self.description)?,
            image_url: optional_url("image_url", self.image_url)?,
            category: optional_text(self.category),
            tags: normalize_tags(self.tags),
            sequence: self.sequence.unwrap_or(0),
            featured: self.featured.unwrap_or(false),
        })
    }
}

/// GET /api/websites
pub async fn handle_list_websites(
    State(state): State<AppState>,
) -> Result<Json<Vec<WebsiteRow>>, AppError> {
    let websites = sqlx::query_as::<_, WebsiteRow>(
        "SELECT * FROM websites ORDER BY sequence ASC, created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(websites))
}

/// GET /api/websites/:id
pub async fn handle_get_website(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WebsiteRow>, AppError> {
    let website = sqlx::query_as::<_, WebsiteRow>("SELECT * FROM websites WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Website {id} not found")))?;
    Ok(Json(website))
}

/// POST /api/websites
pub async fn handle_create_website(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<WebsiteRequest>,
) -> Result<(StatusCode, Json<WebsiteRow>), AppError> {
    let w = req.validate()?;

    let created = sqlx::query_as::<_, WebsiteRow>(
        r#"
        INSERT INTO websites
            (name, url, description, image_url, category, tags, sequence, featured)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&w.name)
    .bind(&w.url)
    .bind(&w.description)
    .bind(&w.image_url)
    .bind(&w.category)
    .bind(&w.tags)
    .bind(w.sequence)
    .bind(w.featured)
    .fetch_one(&state.db)
    .await?;

    info!("Admin {} created website {}", admin.id, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/websites/:id
pub async fn handle_update_website(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<WebsiteRequest>,
) -> Result<Json<WebsiteRow>, AppError> {
    let w = req.validate()?;

    let updated = sqlx::query_as::<_, WebsiteRow>(
        r#"
        UPDATE websites SET
            name = $2, url = $3, description = $4, image_url = $5,
            category = $6, tags = $7, sequence = $8, featured = $9,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&w.name)
    .bind(&w.url)
    .bind(&w.description)
    .bind(&w.image_url)
    .bind(&w.category)
    .bind(&w.tags)
    .bind(w.sequence)
    .bind(w.featured)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Website {id} not found")))?;

    info!("Admin {} updated website {id}", admin.id);
    Ok(Json(updated))
}

/// DELETE /api/websites/:id
pub async fn handle_delete_website(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM websites WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Website {id} not found")));
    }

    info!("Admin {} deleted website {id}", admin.id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/websites/reorder
///
/// Sets `sequence` to each id's position in the submitted list.
pub async fn handle_reorder_websites(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    let ids = req.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE websites SET sequence = (o.position - 1)::int, updated_at = now()
        FROM UNNEST($1::uuid[]) WITH ORDINALITY AS o(id, position)
        WHERE websites.id = o.id
        "#,
    )
    .bind(&ids)
    .execute(&state.db)
    .await?;

    info!(
        "Admin {} reordered {} of {} websites",
        admin.id,
        result.rows_affected(),
        ids.len()
    );
    Ok(StatusCode::NO_CONTENT)
}
