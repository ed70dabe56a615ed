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
use crate::models::template::TemplateRow;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TemplateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub price_cents: Option<i32>,
    pub sequence: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub title: String,
    pub description: String,
    pub url: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub price_cents: Option<i32>,
    pub sequence: i32,
}

impl TemplateRequest {
    pub fn validate(self) -> Result<NewTemplate, AppError> {
        if matches!(self.price_cents, Some(p) if p < 0) {
            return Err(AppError::Validation(
                "price_cents must not be negative".to_string(),
            ));
        }
        Ok(NewTemplate {
            title: required_text("title", &self.title)?,
            description: required_text("description", &self.description)?,
            url: validate_url("url", &self.url)?,
            preview_url: optional_url("preview_url", self.preview_url)?,
            image_url: optional_url("image_url", self.image_url)?,
            category: optional_text(self.category),
            tags: normalize_tags(self.tags),
            price_cents: self.price_cents,
            sequence: self.sequence.unwrap_or(0),
        })
    }
}

/// GET /api/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateRow>>, AppError> {
    let templates = sqlx::query_as::<_, TemplateRow>(
        "SELECT * FROM templates ORDER BY sequence ASC, created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(templates))
}

/// GET /api/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateRow>, AppError> {
    sqlx::query_as::<_, TemplateRow>("SELECT * FROM templates WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

/// POST /api/templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<TemplateRequest>,
) -> Result<(StatusCode, Json<TemplateRow>), AppError> {
    let t = req.validate()?;

    let created = sqlx::query_as::<_, TemplateRow>(
        r#"
        INSERT INTO templates
            (title, description, url, preview_url, image_url, category, tags, price_cents, sequence)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&t.title)
    .bind(&t.description)
    .bind(&t.url)
    .bind(&t.preview_url)
    .bind(&t.image_url)
    .bind(&t.category)
    .bind(&t.tags)
    .bind(t.price_cents)
    .bind(t.sequence)
    .fetch_one(&state.db)
    .await?;

    info!("Admin {} created template {}", admin.id, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/templates/:id
pub async fn handle_update_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<TemplateRequest>,
) -> Result<Json<TemplateRow>, AppError> {
    let t = req.validate()?;

    let updated = sqlx::query_as::<_, TemplateRow>(
        r#"
        UPDATE templates SET
            title = $2, description = $3, url = $4, preview_url = $5, image_url = $6,
            category = $7, tags = $8, price_cents = $9, sequence = $10,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&t.title)
    .bind(&t.description)
    .bind(&t.url)
    .bind(&t.preview_url)
    .bind(&t.image_url)
    .bind(&t.category)
    .bind(&t.tags)
    .bind(t.price_cents)
    .bind(t.sequence)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))?;

    info!("Admin {} updated template {id}", admin.id);
    Ok(Json(updated))
}

/// DELETE /api/templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Template {id} not found")));
    }

    info!("Admin {} deleted template {id}", admin.id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/templates/reorder
pub async fn handle_reorder_templates(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    let ids = req.validate()?;

    sqlx::query(
        r#"
        UPDATE templates SET sequence = (o.position - 1)::int, updated_at = now()
        FROM UNNEST($1::uuid[]) WITH ORDINALITY AS o(id, position)
        WHERE templates.id = o.id
        "#,
    )
    .bind(&ids)
    .execute(&state.db)
    .await?;

    info!("Admin {} reordered {} templates", admin.id, ids.len());
    Ok(StatusCode::NO_CONTENT)
}
