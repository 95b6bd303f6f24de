//! Plain-text normalization passes applied to extracted page text.

use std::sync::LazyLock;

use regex::Regex;

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Truncate `text` to at most `max_chars` characters without splitting a word.
///
/// The cut lands on the last whitespace at or before the limit and trailing
/// whitespace is dropped. A single word longer than the limit yields an
/// empty string.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let Some((cut, next)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let head = &text[..cut];
    if next.is_whitespace() {
        return head.trim_end().to_string();
    }

    match head.rfind(char::is_whitespace) {
        Some(boundary) => head[..boundary].trim_end().to_string(),
        None => String::new(),
    }
}

/// Number of whitespace-delimited tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
