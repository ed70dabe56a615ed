use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, AdminUser, AuthUser};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::user::{UserRole, UserRow};
use crate::state::AppState;
use crate::users::{CreateUserRequest, NewUser, UpdateUserRequest};

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

async fn insert_user(state: &AppState, user: NewUser) -> Result<UserRow, AppError> {
    let password_hash = hash_password(user.password).await?;
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, name, role, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::from_insert(e, DUPLICATE_EMAIL))
}

/// POST /api/users
///
/// Public sign-up. Always creates a regular user, whatever `role` says.
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let mut user = req.validate()?;
    user.role = UserRole::User;

    let created = insert_user(&state, user).await?;
    info!("Registered user {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/users/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<UserRow> {
    Json(user)
}

/// GET /api/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserRow>>, AppError> {
    let users = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users))
}

/// POST /api/admin/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    // Validation runs before any database access.
    let user = req.validate()?;

    let created = insert_user(&state, user).await?;
    info!(
        "Admin {} created user {} with role {}",
        admin.id, created.id, created.role
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/admin/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserRow>, AppError> {
    let changes = req.validate()?;

    if id == admin.id && changes.role == Some(UserRole::User) {
        return Err(AppError::Validation(
            "you cannot remove your own admin role".to_string(),
        ));
    }

    let password_hash = match changes.password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    let updated = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET
            email = COALESCE($2, email),
            name = COALESCE($3, name),
            role = COALESCE($4, role),
            password_hash = COALESCE($5, password_hash),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.email)
    .bind(changes.name)
    .bind(changes.role.map(|r| r.as_str()))
    .bind(password_hash)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| AppError::from_insert(e, DUPLICATE_EMAIL))?
    .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    info!("Admin {} updated user {}", admin.id, updated.id);
    Ok(Json(updated))
}

/// DELETE /api/admin/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if id == admin.id {
        return Err(AppError::Validation(
            "you cannot delete your own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }

    info!("Admin {} deleted user {id}", admin.id);
    Ok(StatusCode::NO_CONTENT)
}
