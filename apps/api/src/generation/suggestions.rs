//! Prompt suggestions for the generator's empty state.
//!
//! At most two LLM passes: a second pass with a different seed runs only if
//! the first yields fewer than `MIN_SUGGESTIONS` usable ideas. Whatever is
//! still missing is filled from fixed theme lists, so the endpoint always
//! answers even when the gateway is down.

use std::collections::HashSet;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::generation::prompts::suggestions_prompt;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, ChatMessage, CompletionOptions, LlmClient, LlmError};

pub const MIN_SUGGESTIONS: usize = 6;
pub const MAX_SUGGESTIONS: usize = 12;
const MAX_SUGGESTION_LEN: usize = 160;

const THEMES: &[&str] = &[
    "minimal",
    "glassmorphism",
    "neo-brutalist",
    "dark mode",
    "gradient",
    "retro terminal",
];

const COMPONENTS: &[&str] = &[
    "pricing table",
    "hero section",
    "login form",
    "analytics dashboard card",
    "testimonial carousel",
    "navigation bar",
    "feature grid",
    "newsletter footer",
];

const DETAILS: &[&str] = &[
    "with a monthly/yearly toggle",
    "with subtle hover animations",
    "with an accessible keyboard flow",
    "with skeleton loading states",
    "with responsive mobile layout",
];

/// Where suggestions come from. Seeded so a retry asks for a different sample.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn fetch(&self, count: usize, seed: u64) -> Result<Vec<String>, LlmError>;
}

pub struct LlmSuggestionSource<'a> {
    pub llm: &'a LlmClient,
    pub model: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionPayload {
    List(Vec<String>),
    Wrapped { suggestions: Vec<String> },
}

#[async_trait]
impl SuggestionSource for LlmSuggestionSource<'_> {
    async fn fetch(&self, count: usize, seed: u64) -> Result<Vec<String>, LlmError> {
        let messages = [
            ChatMessage::system(JSON_ONLY_SYSTEM),
            ChatMessage::user(suggestions_prompt(count)),
        ];
        let options = CompletionOptions {
            seed: Some(seed),
            temperature: Some(1.0),
        };
        let text = self.llm.complete(self.model, &messages, options).await?;
        parse_suggestions(&text)
    }
}

pub fn parse_suggestions(text: &str) -> Result<Vec<String>, LlmError> {
    let payload: SuggestionPayload = serde_json::from_str(strip_json_fences(text))?;
    Ok(match payload {
        SuggestionPayload::List(list) => list,
        SuggestionPayload::Wrapped { suggestions } => suggestions,
    })
}

/// Appends trimmed, non-empty, not-too-long, case-insensitively new items.
fn merge_unique(target: &mut Vec<String>, seen: &mut HashSet<String>, items: Vec<String>) {
    for item in items {
        let item = item.trim().trim_start_matches(['-', '*', ' ']).trim();
        if item.is_empty() || item.chars().count() > MAX_SUGGESTION_LEN {
            continue;
        }
        if seen.insert(item.to_lowercase()) {
            target.push(item.to_string());
        }
    }
}

/// Deterministic fallback: the `index`-th theme/component/detail combination.
pub fn fallback_suggestion(index: usize) -> String {
    let theme = THEMES[index % THEMES.len()];
    let component = COMPONENTS[index % COMPONENTS.len()];
    let detail = DETAILS[index % DETAILS.len()];
    format!("A {theme} {component} {detail}")
}

async fn fetch_logged(source: &dyn SuggestionSource, count: usize, seed: u64) -> Vec<String> {
    match source.fetch(count, seed).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Suggestion pass with seed {seed} failed: {e}");
            Vec::new()
        }
    }
}

/// Produces exactly `count` suggestions (clamped to `MIN..=MAX`).
pub async fn generate_suggestions(
    source: &dyn SuggestionSource,
    count: usize,
    first_seed: u64,
    retry_seed: u64,
) -> Vec<String> {
    let count = count.clamp(MIN_SUGGESTIONS, MAX_SUGGESTIONS);
    let mut suggestions = Vec::with_capacity(count);
    let mut seen = HashSet::new();

    let first = fetch_logged(source, count, first_seed).await;
    merge_unique(&mut suggestions, &mut seen, first);

    if suggestions.len() < MIN_SUGGESTIONS {
        info!(
            "Only {} suggestions on first pass, retrying with a new seed",
            suggestions.len()
        );
        let second = fetch_logged(source, count, retry_seed).await;
        merge_unique(&mut suggestions, &mut seen, second);
    }

    let from_llm = suggestions.len().min(count);
    let mut index = 0;
    while suggestions.len() < count && index < THEMES.len() * COMPONENTS.len() {
        merge_unique(&mut suggestions, &mut seen, vec![fallback_suggestion(index)]);
        index += 1;
    }
    suggestions.truncate(count);

    info!(
        "Returning {} suggestions ({} from LLM, {} fallback)",
        suggestions.len(),
        from_llm,
        suggestions.len().saturating_sub(from_llm)
    );
    suggestions
}

/// Two distinct random seeds for the first pass and the retry.
pub fn random_seeds() -> (u64, u64) {
    let mut rng = rand::thread_rng();
    let first: u64 = rng.gen();
    let retry = first.wrapping_add(rng.gen_range(1..u64::MAX));
    (first, retry)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<String>, LlmError>>>,
        seeds: Mutex<Vec<u64>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<String>, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seeds: Mutex::new(Vec::new()),
            }
        }

        fn seeds(&self) -> Vec<u64> {
            self.seeds.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SuggestionSource for ScriptedSource {
        async fn fetch(&self, _count: usize, seed: u64) -> Result<Vec<String>, LlmError> {
            self.seeds.lock().unwrap().push(seed);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    fn ideas(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("{prefix} idea {i}")).collect()
    }

    #[tokio::test]
    async fn test_no_retry_when_first_pass_suffices() {
        let source = ScriptedSource::new(vec![Ok(ideas(6, "a"))]);
        let result = generate_suggestions(&source, 6, 1, 2).await;
        assert_eq!(result, ideas(6, "a"));
        assert_eq!(source.seeds(), vec![1]);
    }

    #[tokio::test]
    async fn test_retry_with_different_seed_and_merge() {
        let source = ScriptedSource::new(vec![Ok(ideas(3, "a")), Ok(ideas(4, "b"))]);
        let result = generate_suggestions(&source, 6, 11, 22).await;
        assert_eq!(source.seeds(), vec![11, 22]);
        assert_eq!(result.len(), 6);
        assert_eq!(&result[..3], &ideas(3, "a")[..]);
        assert_eq!(result[3], "b idea 0");
    }

    #[tokio::test]
    async fn test_at_most_two_passes_then_fallback() {
        let source = ScriptedSource::new(vec![Ok(ideas(1, "a")), Ok(ideas(1, "a"))]);
        let result = generate_suggestions(&source, 6, 1, 2).await;
        assert_eq!(source.seeds().len(), 2);
        assert_eq!(result.len(), 6);
        assert_eq!(result[0], "a idea 0");
        assert_eq!(result[1], fallback_suggestion(0));
    }

    #[tokio::test]
    async fn test_gateway_failure_uses_fallback_only() {
        let source = ScriptedSource::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
        ]);
        let result = generate_suggestions(&source, 8, 1, 2).await;
        let expected: Vec<String> = (0..8).map(fallback_suggestion).collect();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_count_is_clamped() {
        let source = ScriptedSource::new(vec![Ok(ideas(20, "a"))]);
        assert_eq!(generate_suggestions(&source, 50, 1, 2).await.len(), MAX_SUGGESTIONS);
        let source = ScriptedSource::new(vec![Ok(ideas(20, "a"))]);
        assert_eq!(generate_suggestions(&source, 0, 1, 2).await.len(), MIN_SUGGESTIONS);
    }

    #[test]
    fn test_fallback_is_deterministic_and_distinct() {
        assert_eq!(fallback_suggestion(3), fallback_suggestion(3));
        let all: HashSet<String> = (0..MAX_SUGGESTIONS).map(fallback_suggestion).collect();
        assert_eq!(all.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_parse_suggestions_accepts_both_shapes() {
        assert_eq!(
            parse_suggestions("```json\n[\"a\", \"b\"]\n```").unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            parse_suggestions(r#"{"suggestions": ["c"]}"#).unwrap(),
            vec!["c"]
        );
        assert!(parse_suggestions("not json").is_err());
    }

    #[test]
    fn test_merge_unique_filters_noise() {
        let mut target = Vec::new();
        let mut seen = HashSet::new();
        merge_unique(
            &mut target,
            &mut seen,
            vec![
                "- A hero".into(),
                "a hero".into(),
                "".into(),
                "x".repeat(200),
            ],
        );
        assert_eq!(target, vec!["A hero"]);
    }

    #[test]
    fn test_random_seeds_differ() {
        for _ in 0..100 {
            let (a, b) = random_seeds();
            assert_ne!(a, b);
        }
    }
}
