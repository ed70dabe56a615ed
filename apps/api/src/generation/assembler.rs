use crate::generation::prompts::PROJECT_CONTEXT_PREFIX;
use crate::llm_client::ChatMessage;

/// Builds the message list sent upstream:
/// system prompt → project context (as a user turn) → history → new prompt.
///
/// History is forwarded untruncated; the gateway enforces context limits.
pub fn assemble_messages(
    system_prompt: &str,
    project_context: Option<&str>,
    history: &[ChatMessage],
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(system_prompt));

    if let Some(context) = project_context.map(str::trim).filter(|c| !c.is_empty()) {
        messages.push(ChatMessage::user(format!("{PROJECT_CONTEXT_PREFIX}{context}")));
    }

    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(prompt));
    messages
}
