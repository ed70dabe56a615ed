//! Curated directory: websites and templates, plus the public JSON feed.

pub mod feed;
pub mod templates;
pub mod websites;

use std::collections::HashSet;

use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;

/// Trims, drops empties and removes case-insensitive duplicates, keeping
/// the first spelling seen.
pub fn normalize_tags(tags: Option<Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

pub fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Blank optional strings are stored as NULL.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Requires an absolute http(s) URL.
pub fn validate_url(field: &str, value: &str) -> Result<String, AppError> {
    let value = required_text(field, value)?;
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(value),
        _ => Err(AppError::Validation(format!(
            "{field} must be an absolute http(s) URL"
        ))),
    }
}

pub fn optional_url(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    optional_text(value)
        .map(|v| validate_url(field, &v))
        .transpose()
}

/// Body of the drag-and-drop reorder endpoints: the full list of ids in
/// their new display order.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

impl ReorderRequest {
    pub fn validate(self) -> Result<Vec<Uuid>, AppError> {
        if self.ids.is_empty() {
            return Err(AppError::Validation("ids must not be empty".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::Validation(format!("duplicate id {dup}")));
        }
        Ok(self.ids)
    }
}
