// Component generation: prompt assembly, upstream streaming relays and
// prompt suggestions. All LLM calls go through llm_client.

pub mod assembler;
pub mod handlers;
pub mod prompts;
pub mod relay;
pub mod suggestions;
