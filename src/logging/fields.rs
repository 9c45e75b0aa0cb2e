//! Field helpers for structured logging

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Works on char boundaries, so multi-byte input never panics.
///
/// # Examples
///
/// ```
/// use clawgate::logging::truncate_detail;
///
/// assert_eq!(truncate_detail("HTTP 503: overloaded", 8), "HTTP 503...");
/// assert_eq!(truncate_detail("short", 200), "short");
/// ```
pub fn truncate_detail(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Single-line preview of user content for opt-in content logging.
pub fn preview_text(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    truncate_detail(flat.trim(), 100)
}
