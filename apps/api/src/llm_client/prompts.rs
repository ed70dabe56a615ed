// Cross-cutting prompt fragments shared by the generation endpoints.
// Endpoint-specific prompts live in generation/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output contract parsed by `sandbox::parse_file_tags`.
pub const FILE_TAG_FORMAT_INSTRUCTION: &str = "\
    OUTPUT FORMAT (mandatory): emit every file as \
    <file path=\"relative/path.tsx\">...file content...</file>. \
    Paths are relative, use forward slashes and never contain '..'. \
    The entry component lives in App.tsx and is the default export. \
    Do NOT use markdown code fences. Do NOT write prose outside the file tags.";
