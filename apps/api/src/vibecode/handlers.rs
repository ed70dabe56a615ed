use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::{types::Json as DbJson, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::vibecode::{SubmissionStatus, VibecodeRow};
use crate::state::AppState;
use crate::vibecode::{next_available_slug, slugify, CreateVibecodeRequest, NewVibecode};

/// Concurrent submissions with the same title can race for a slug; the
/// unique index catches it and we pick again.
const SLUG_ATTEMPTS: u32 = 3;

async fn taken_slugs(pool: &PgPool, base: &str) -> Result<HashSet<String>, AppError> {
    let slugs: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM vibecode_components WHERE slug = $1 OR slug LIKE $1 || '-%'",
    )
    .bind(base)
    .fetch_all(pool)
    .await?;
    Ok(slugs.into_iter().collect())
}

async fn insert_component(
    pool: &PgPool,
    component: &NewVibecode,
    slug: &str,
    created_by: Uuid,
) -> Result<VibecodeRow, sqlx::Error> {
    sqlx::query_as::<_, VibecodeRow>(
        r#"
        INSERT INTO vibecode_components
            (title, description, slug, category, tags, code, files, entry_file, created_by, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&component.title)
    .bind(&component.description)
    .bind(slug)
    .bind(&component.category)
    .bind(&component.tags)
    .bind(&component.code)
    .bind(component.files.clone().map(DbJson))
    .bind(&component.entry_file)
    .bind(created_by)
    .bind(SubmissionStatus::Pending.as_str())
    .fetch_one(pool)
    .await
}

/// POST /api/vibecode
///
/// Any signed-in user may submit; the component stays `pending` until reviewed.
pub async fn handle_create_vibecode(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateVibecodeRequest>,
) -> Result<(StatusCode, Json<VibecodeRow>), AppError> {
    let component = req.validate()?;
    let base = slugify(&component.title);

    for attempt in 1..=SLUG_ATTEMPTS {
        let taken = taken_slugs(&state.db, &base).await?;
        let slug = next_available_slug(&base, &taken);

        match insert_component(&state.db, &component, &slug, user.id).await {
            Ok(row) => {
                info!("User {} submitted component {} ({})", user.id, row.id, row.slug);
                return Ok((StatusCode::CREATED, Json(row)));
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                warn!("Slug '{slug}' taken concurrently (attempt {attempt}/{SLUG_ATTEMPTS})");
            }
            Err(e) => return Err(AppError::Database(e)),
        }
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a unique slug for '{}'",
        component.title
    )))
}

/// GET /api/vibecode
pub async fn handle_list_vibecode(
    State(state): State<AppState>,
) -> Result<Json<Vec<VibecodeRow>>, AppError> {
    let rows = sqlx::query_as::<_, VibecodeRow>(
        "SELECT * FROM vibecode_components WHERE status = $1 ORDER BY created_at DESC",
    )
    .bind(SubmissionStatus::Approved.as_str())
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/vibecode/:slug
pub async fn handle_get_vibecode(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<VibecodeRow>, AppError> {
    sqlx::query_as::<_, VibecodeRow>(
        "SELECT * FROM vibecode_components WHERE slug = $1 AND status = $2",
    )
    .bind(&slug)
    .bind(SubmissionStatus::Approved.as_str())
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| AppError::NotFound(format!("Component '{slug}' not found")))
}

#[derive(Debug, Deserialize)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
}

/// GET /api/admin/submissions?status=pending
pub async fn handle_list_submissions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<Vec<VibecodeRow>>, AppError> {
    let rows = sqlx::query_as::<_, VibecodeRow>(
        r#"
        SELECT * FROM vibecode_components
        WHERE $1::text IS NULL OR status = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: SubmissionStatus,
}

/// PATCH /api/admin/submissions/:id
pub async fn handle_review_submission(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> Result<Json<VibecodeRow>, AppError> {
    let row = sqlx::query_as::<_, VibecodeRow>(
        r#"
        UPDATE vibecode_components SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

    info!("Admin {} marked submission {id} as {}", admin.id, row.status);
    Ok(Json(row))
}

/// DELETE /api/admin/submissions/:id
pub async fn handle_delete_submission(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM vibecode_components WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Submission {id} not found")));
    }

    info!("Admin {} deleted submission {id}", admin.id);
    Ok(StatusCode::NO_CONTENT)
}
