//! Configuration loading and small text helpers shared by the agents.

/// TOML configuration (`lyceum.toml`) with validation and snapshot reloads.
pub mod toml_config;

/// Strip a surrounding markdown code fence (```` ``` ```` or ```` ```json ````) if present.
///
/// Text that is not fenced is returned trimmed but otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`, `markdown`) on the opening line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Truncate `text` to at most `max_chars` characters, appending `note` when cut.
///
/// Counts characters rather than bytes so multi-byte text is never split mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize, note: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], note),
        None => text.to_string(),
    }
}
