//! Published AI-generated components ("vibecode") and their review queue.

pub mod handlers;

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::directory::required_text;
use crate::errors::AppError;
use crate::sandbox::validate_path;

pub const MAX_TAGS: usize = 8;
pub const MAX_TAG_LEN: usize = 32;
const MAX_SLUG_LEN: usize = 64;
const FALLBACK_SLUG: &str = "component";
const DEFAULT_CATEGORY: &str = "other";

#[derive(Debug, Default, Deserialize)]
pub struct CreateVibecodeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub code: Option<String>,
    pub files: Option<BTreeMap<String, String>>,
    pub entry_file: Option<String>,
}

/// A submission that satisfies every document invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVibecode {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub code: Option<String>,
    pub files: Option<BTreeMap<String, String>>,
    pub entry_file: Option<String>,
}

impl CreateVibecodeRequest {
    pub fn validate(self) -> Result<NewVibecode, AppError> {
        let title = required_text("title", &self.title)?;
        let description = required_text("description", &self.description)?;

        let code = self.code.filter(|c| !c.trim().is_empty());
        let files = self.files.filter(|f| !f.is_empty());

        if code.is_none() && files.is_none() {
            return Err(AppError::Validation(
                "either code or files is required".to_string(),
            ));
        }

        if let Some(files) = &files {
            for path in files.keys() {
                validate_path(path)?;
            }
        }

        let entry_file = self
            .entry_file
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(entry) = &entry_file {
            let present = files.as_ref().is_some_and(|f| f.contains_key(entry));
            if !present {
                return Err(AppError::Validation(format!(
                    "entry_file '{entry}' is not one of the submitted files"
                )));
            }
        }

        Ok(NewVibecode {
            title,
            description,
            category: self
                .category
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags: clean_tags(self.tags.unwrap_or_default()),
            code,
            files,
            entry_file,
        })
    }
}

/// Lowercases, truncates each tag to `MAX_TAG_LEN` chars, dedupes and keeps
/// at most `MAX_TAGS`.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(MAX_TAG_LEN).collect::<String>())
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_TAGS)
        .collect()
}

/// ASCII-lowercases and joins alphanumeric runs with single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let mut slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Returns `base` if free, else `base-N` for the smallest unused N ≥ 1.
pub fn next_available_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n: u32| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(slugs: &[&str]) -> HashSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hero Card"), "hero-card");
        assert_eq!(slugify("  Pricing -- Table!! v2 "), "pricing-table-v2");
        assert_eq!(slugify("Café Menu"), "caf-menu");
        assert_eq!(slugify("!!!"), "component");
    }

    #[test]
    fn test_slugify_truncates_without_trailing_hyphen() {
        let title = format!("{} tail", "a".repeat(63));
        let slug = slugify(&title);
        assert_eq!(slug, "a".repeat(63));
    }

    #[test]
    fn test_first_submission_keeps_base_slug() {
        assert_eq!(next_available_slug("hero-card", &taken(&[])), "hero-card");
    }

    #[test]
    fn test_second_submission_gets_suffix_one() {
        assert_eq!(
            next_available_slug("hero-card", &taken(&["hero-card"])),
            "hero-card-1"
        );
    }

    #[test]
    fn test_smallest_unused_suffix_fills_gaps() {
        let existing = taken(&["hero-card", "hero-card-1", "hero-card-3"]);
        assert_eq!(next_available_slug("hero-card", &existing), "hero-card-2");
    }

    #[test]
    fn test_clean_tags_caps_and_dedupes() {
        let tags: Vec<String> = (0..12).map(|i| format!("Tag{i}")).collect();
        let mut input = vec!["TAG0".to_string(), "  ".to_string()];
        input.extend(tags);
        let cleaned = clean_tags(input);
        assert_eq!(cleaned.len(), MAX_TAGS);
        assert_eq!(cleaned[0], "tag0");
        assert_eq!(cleaned[1], "tag1");

        let long = clean_tags(vec!["x".repeat(50)]);
        assert_eq!(long[0].len(), MAX_TAG_LEN);
    }

    fn base_request() -> CreateVibecodeRequest {
        CreateVibecodeRequest {
            title: "Hero Card".into(),
            description: "A card".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_code_or_files() {
        assert!(base_request().validate().is_err());

        let mut req = base_request();
        req.code = Some("export default () => null".into());
        let v = req.validate().unwrap();
        assert_eq!(v.category, "other");
        assert!(v.tags.is_empty());
    }

    #[test]
    fn test_entry_file_must_exist_in_files() {
        let mut req = base_request();
        req.files = Some(BTreeMap::from([("App.tsx".to_string(), "x".to_string())]));
        req.entry_file = Some("Main.tsx".into());
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.files = Some(BTreeMap::from([("App.tsx".to_string(), "x".to_string())]));
        req.entry_file = Some("App.tsx".into());
        assert_eq!(req.validate().unwrap().entry_file.as_deref(), Some("App.tsx"));
    }

    #[test]
    fn test_entry_file_without_files_rejected() {
        let mut req = base_request();
        req.code = Some("x".into());
        req.entry_file = Some("App.tsx".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_file_paths_are_validated() {
        let mut req = base_request();
        req.files = Some(BTreeMap::from([("../evil.ts".to_string(), "x".to_string())]));
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
