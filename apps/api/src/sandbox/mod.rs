//! Parser for the `<file path="...">...</file>` output format the generator is
//! prompted to produce, turning it into a validated list of files.
//!
//! The parser is lenient about the text around tags and tolerates a truncated
//! final tag, so it can run on a stream that is still arriving. Paths are
//! strict: relative, forward-slash separated, no `..`, unique.

pub mod handlers;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

const OPEN_TAG: &str = "<file";
const CLOSE_TAG: &str = "</file>";
const MAX_PATH_LEN: usize = 256;

/// Preferred entry points, most specific first.
const ENTRY_CANDIDATES: &[&str] = &[
    "App.tsx",
    "App.jsx",
    "src/App.tsx",
    "src/App.jsx",
    "index.tsx",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("invalid file path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("duplicate file path '{0}'")]
    DuplicatePath(String),

    #[error("no <file> tags found in source")]
    NoFiles,
}

impl From<SandboxError> for AppError {
    fn from(e: SandboxError) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxFile {
    pub path: String,
    pub content: String,
    /// False only for a final tag whose `</file>` has not arrived yet.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSandbox {
    pub files: Vec<SandboxFile>,
    pub entry_file: Option<String>,
}

/// Extracts every file tag in order. Text outside tags is ignored, and so is
/// a `<file ...>` without a `path` attribute (prose such as "each <file below>").
pub fn parse_file_tags(text: &str) -> Vec<SandboxFile> {
    let mut files = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN_TAG) {
        let after_name = &rest[start + OPEN_TAG.len()..];

        // `<filex` or `<file>` are not file tags.
        if !after_name.starts_with(char::is_whitespace) {
            rest = after_name;
            continue;
        }

        // Opening tag still streaming in.
        let Some(tag_end) = after_name.find('>') else {
            break;
        };

        let attrs = &after_name[..tag_end];
        // Prose like "a <file or two <file path=...>": rescan from the inner `<`.
        if let Some(inner) = attrs.find('<') {
            rest = &after_name[inner..];
            continue;
        }
        let body = &after_name[tag_end + 1..];
        let Some(path) = path_attribute(attrs) else {
            rest = body;
            continue;
        };

        if attrs.trim_end().ends_with('/') {
            files.push(SandboxFile {
                path,
                content: String::new(),
                complete: true,
            });
            rest = body;
            continue;
        }

        match body.find(CLOSE_TAG) {
            Some(end) => {
                files.push(SandboxFile {
                    path,
                    content: trim_body(&body[..end]).to_string(),
                    complete: true,
                });
                rest = &body[end + CLOSE_TAG.len()..];
            }
            None => {
                let partial = strip_partial_close(body);
                files.push(SandboxFile {
                    path,
                    content: trim_leading_newline(partial).to_string(),
                    complete: false,
                });
                break;
            }
        }
    }

    files
}

/// Parses, validates and picks the entry file.
pub fn parse_sandbox(text: &str) -> Result<ParsedSandbox, SandboxError> {
    let files = parse_file_tags(text);
    if files.is_empty() {
        return Err(SandboxError::NoFiles);
    }
    validate_files(&files)?;
    let entry_file = pick_entry_file(files.iter().map(|f| f.path.as_str()));
    Ok(ParsedSandbox { files, entry_file })
}

pub fn validate_files(files: &[SandboxFile]) -> Result<(), SandboxError> {
    let mut seen = HashSet::new();
    for file in files {
        validate_path(&file.path)?;
        if !seen.insert(file.path.as_str()) {
            return Err(SandboxError::DuplicatePath(file.path.clone()));
        }
    }
    Ok(())
}

pub fn validate_path(path: &str) -> Result<(), SandboxError> {
    let invalid = |reason| {
        Err(SandboxError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };

    if path.is_empty() {
        return invalid("path is empty");
    }
    if path.len() > MAX_PATH_LEN {
        return invalid("path is too long");
    }
    if path.starts_with('/') {
        return invalid("path must be relative");
    }
    if path.contains('\\') {
        return invalid("use forward slashes");
    }
    if path.chars().any(|c| c.is_control()) {
        return invalid("path contains control characters");
    }
    for segment in path.split('/') {
        match segment {
            "" => return invalid("empty path segment"),
            "." | ".." => return invalid("relative segments are not allowed"),
            _ => {}
        }
    }
    Ok(())
}

pub fn pick_entry_file<'a>(paths: impl Iterator<Item = &'a str> + Clone) -> Option<String> {
    ENTRY_CANDIDATES
        .iter()
        .find(|candidate| paths.clone().any(|p| p == **candidate))
        .map(|c| c.to_string())
        .or_else(|| paths.clone().next().map(str::to_string))
}

/// Reads `path="..."` (or single-quoted) out of a tag's attribute text.
fn path_attribute(attrs: &str) -> Option<String> {
    let mut search = attrs;
    while let Some(idx) = search.find("path") {
        let before_ok = idx == 0 || search[..idx].ends_with(char::is_whitespace);
        let after = search[idx + "path".len()..].trim_start();
        if before_ok {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
                let inner = &value[1..];
                let close = inner.find(quote)?;
                return Some(inner[..close].trim().to_string());
            }
        }
        search = &search[idx + "path".len()..];
    }
    None
}

fn trim_leading_newline(s: &str) -> &str {
    s.strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s)
}

fn trim_body(s: &str) -> &str {
    let s = trim_leading_newline(s);
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

/// Drops a trailing fragment of `</file>` that a stream cut in half.
fn strip_partial_close(body: &str) -> &str {
    for len in (1..CLOSE_TAG.len()).rev() {
        if body.ends_with(&CLOSE_TAG[..len]) {
            return &body[..body.len() - len];
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_multiple_files() {
        let text = "<file path=\"App.tsx\">\nexport default function App() {}\n</file>\n\
                    <file path=\"components/ui/button.tsx\">\nexport const Button = 1;\n</file>";
        let files = parse_file_tags(text);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "App.tsx");
        assert_eq!(files[0].content, "export default function App() {}");
        assert!(files[0].complete);
        assert_eq!(files[1].path, "components/ui/button.tsx");
    }

    #[test]
    fn test_ignores_surrounding_prose() {
        let text = "Sure! Here you go:\n<file path='App.tsx'>x</file>\nEnjoy.";
        let files = parse_file_tags(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "x");
    }

    #[test]
    fn test_prose_mentioning_file_tags_is_skipped() {
        let text = "Each <file below> is TSX.\n<file path=\"App.tsx\">x</file>";
        let files = parse_file_tags(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "App.tsx");
        assert_eq!(files[0].content, "x");

        let parsed = parse_sandbox(text).unwrap();
        assert_eq!(parsed.entry_file.as_deref(), Some("App.tsx"));

        let files = parse_file_tags("a <file or two <file path=\"b.tsx\">y</file>");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "b.tsx");
    }

    #[test]
    fn test_partial_final_file() {
        let text = "<file path=\"App.tsx\">\nconst a = 1;\n</fi";
        let files = parse_file_tags(text);
        assert_eq!(files.len(), 1);
        assert!(!files[0].complete);
        assert_eq!(files[0].content, "const a = 1;\n");
    }

    #[test]
    fn test_truncated_opening_tag_is_dropped() {
        let text = "<file path=\"a.tsx\">a</file><file path=\"b.t";
        let files = parse_file_tags(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.tsx");
    }

    #[test]
    fn test_preserves_inner_markup() {
        let text = "<file path=\"App.tsx\"><div className=\"p-4\"><filex/></div></file>";
        let files = parse_file_tags(text);
        assert_eq!(files[0].content, "<div className=\"p-4\"><filex/></div>");
    }

    #[test]
    fn test_extra_attributes_and_spacing() {
        let text = "<file lang=\"tsx\"  path = \"src/App.tsx\" >x</file>";
        let files = parse_file_tags(text);
        assert_eq!(files[0].path, "src/App.tsx");
    }

    #[test]
    fn test_filepath_attribute_is_not_path() {
        assert!(parse_file_tags("<file filepath=\"a.tsx\">x</file>").is_empty());
    }

    #[test]
    fn test_self_closing_tag() {
        let files = parse_file_tags("<file path=\"empty.css\" />");
        assert_eq!(files[0].content, "");
        assert!(files[0].complete);
    }

    #[test]
    fn test_rejects_path_traversal_and_absolute() {
        for path in ["../secret", "/etc/passwd", "a//b", "a\\b", "./a", ""] {
            assert!(validate_path(path).is_err(), "accepted {path:?}");
        }
        assert!(validate_path("components/ui/card.tsx").is_ok());
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let text = "<file path=\"App.tsx\">a</file><file path=\"App.tsx\">b</file>";
        assert_eq!(
            parse_sandbox(text),
            Err(SandboxError::DuplicatePath("App.tsx".into()))
        );
    }

    #[test]
    fn test_no_files_is_an_error() {
        assert_eq!(parse_sandbox("```tsx\ncode\n```"), Err(SandboxError::NoFiles));
    }

    #[test]
    fn test_entry_file_prefers_app() {
        let text = "<file path=\"lib/utils.ts\">u</file><file path=\"App.tsx\">a</file>";
        let parsed = parse_sandbox(text).unwrap();
        assert_eq!(parsed.entry_file.as_deref(), Some("App.tsx"));

        let files = parse_file_tags("a <file or two <file path=\"b.tsx\">y</file>");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "b.tsx");
    }

    #[test]
    fn test_entry_file_falls_back_to_first() {
        let text = "<file path=\"Hero.tsx\">h</file><file path=\"Card.tsx\">c</file>";
        let parsed = parse_sandbox(text).unwrap();
        assert_eq!(parsed.entry_file.as_deref(), Some("Hero.tsx"));
    }
}
