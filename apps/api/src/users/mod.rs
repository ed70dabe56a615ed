//! User account payloads. Request bodies are parsed into `NewUser` /
//! `UserChanges` before any handler touches the database.

pub mod handlers;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::user::UserRole;

pub const MIN_PASSWORD_LEN: usize = 12;
const MAX_PASSWORD_LEN: usize = 72; // bcrypt ignores bytes past 72
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
}

impl CreateUserRequest {
    /// `role` falls back to `UserRole::User` when the body omits it.
    pub fn validate(self) -> Result<NewUser, AppError> {
        Ok(NewUser {
            email: validate_email(&self.email)?,
            name: validate_name(&self.name)?,
            password: validate_password(self.password)?,
            role: self.role.unwrap_or(UserRole::User),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserChanges, AppError> {
        let changes = UserChanges {
            email: self.email.as_deref().map(validate_email).transpose()?,
            name: self.name.as_deref().map(validate_name).transpose()?,
            password: self.password.map(validate_password).transpose()?,
            role: self.role,
        };
        if changes == UserChanges::default() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        Ok(changes)
    }
}

pub fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!("'{email}' is not a valid email")));
    }
    Ok(email)
}

fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn validate_password(password: String) -> Result<String, AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(password)
}
