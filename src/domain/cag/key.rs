//! Query normalization into cache keys

use crate::domain::DomainError;

/// Derive the cache key for a query: lower-cased, trimmed, inner whitespace
/// collapsed to single spaces.
///
/// Empty or whitespace-only input is rejected before any lookup happens.
pub fn normalize_query(query: &str) -> Result<String, DomainError> {
    let key = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if key.is_empty() {
        return Err(DomainError::invalid_query(
            "query must contain at least one non-whitespace character",
        ));
    }

    Ok(key)
}

/// Shorten query text for log lines, respecting char boundaries
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
