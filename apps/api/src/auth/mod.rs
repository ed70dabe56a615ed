//! Bearer-session authentication.
//!
//! `POST /api/auth/login` trades email + password for an opaque token stored in
//! `sessions`. Handlers opt in by taking `AuthUser` or `AdminUser`.

pub mod handlers;

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user::{SessionRow, UserRow};
use crate::state::AppState;

const TOKEN_BYTES: usize = 32;

/// Any signed-in user.
pub struct AuthUser(pub UserRow);

/// A signed-in user with the `admin` role.
pub struct AdminUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = find_session_user(&state.db, token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!("Non-admin user {} attempted an admin action", user.id);
            return Err(AppError::Unauthorized);
        }
        Ok(AdminUser(user))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hashes on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .context("password hashing task panicked")?
        .context("password hashing failed")?;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task panicked")?
        // A malformed stored hash never authenticates.
        .unwrap_or(false);
    Ok(ok)
}

/// Issues a new session. Expired sessions of every user are purged first.
pub async fn create_session(
    pool: &PgPool,
    user_id: uuid::Uuid,
    ttl_hours: i64,
) -> Result<SessionRow, AppError> {
    let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?
        .rows_affected();
    if purged > 0 {
        tracing::debug!("Purged {purged} expired sessions");
    }

    let session = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(generate_token())
    .bind(user_id)
    .bind(Utc::now() + Duration::hours(ttl_hours))
    .fetch_one(pool)
    .await?;
    Ok(session)
}

pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

async fn find_session_user(pool: &PgPool, token: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT u.* FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = $1 AND s.expires_at > now()
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
