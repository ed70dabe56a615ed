// Prompt constants for the generation endpoints.
// Shared fragments come from llm_client::prompts.

use crate::llm_client::prompts::FILE_TAG_FORMAT_INSTRUCTION;

/// Used when neither `ai_config` nor `SYSTEM_PROMPT` provides one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Shadway's component generator, an expert React and TypeScript engineer \
who builds polished UI with shadcn/ui, Tailwind CSS and lucide-react icons.

Rules:
- Produce complete, runnable code. No placeholders, no TODOs, no elided sections.
- Import shadcn/ui primitives from \"@/components/ui/<name>\" and include the source \
of every primitive you use as its own file under components/ui/.
- Use Tailwind utility classes for all styling. Support dark mode with `dark:` variants.
- Keep components accessible: semantic elements, labels, focus states, aria attributes.
- The default export of App.tsx renders a self-contained demo of the component.

OUTPUT FORMAT (mandatory): emit every file as \
<file path=\"relative/path.tsx\">...file content...</file>. \
Paths are relative, use forward slashes and never contain '..'. \
Do NOT use markdown code fences. Do NOT write prose outside the file tags.";

/// Prefix for the optional project context message.
pub const PROJECT_CONTEXT_PREFIX: &str = "Project context:\n";

pub const CHATBOT_SYSTEM_PROMPT: &str = "\
You are the Shadway assistant. Shadway is a curated directory of websites, templates \
and components built with shadcn/ui. Help visitors find inspiration, explain how \
shadcn/ui, Radix primitives and Tailwind CSS fit together, and answer questions \
about building interfaces with them. Be concise and use markdown for code.";

pub const SUGGESTIONS_PROMPT_TEMPLATE: &str = "\
Suggest {count} distinct, specific ideas for UI components a developer could generate \
with shadcn/ui and Tailwind CSS. Each idea is one sentence under 20 words describing \
the component and its visual style, e.g. \"A glassmorphism pricing table with a monthly/yearly toggle\".

Return a JSON array of strings and nothing else.";

pub fn suggestions_prompt(count: usize) -> String {
    SUGGESTIONS_PROMPT_TEMPLATE.replace("{count}", &count.to_string())
}

/// The file-tag contract must be part of whatever system prompt is active,
/// including admin-edited ones that forgot it.
pub fn with_output_contract(system_prompt: &str) -> String {
    if system_prompt.contains("<file path=") {
        system_prompt.to_string()
    } else {
        format!("{system_prompt}\n\n{FILE_TAG_FORMAT_INSTRUCTION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_already_carries_contract() {
        assert_eq!(with_output_contract(DEFAULT_SYSTEM_PROMPT), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_custom_prompt_gets_contract_appended() {
        let prompt = with_output_contract("Only build forms.");
        assert!(prompt.starts_with("Only build forms."));
        assert!(prompt.contains("<file path="));
    }

    #[test]
    fn test_suggestions_prompt_substitutes_count() {
        assert!(suggestions_prompt(8).starts_with("Suggest 8 distinct"));
    }
}
