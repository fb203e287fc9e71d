//! Character-based text helpers for previews and reply limits.

const ELLIPSIS: &str = "...";

/// Shorten `text` to at most `max_chars` characters, ending in `...` when
/// something was cut. Limits shorter than the ellipsis cut without one.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    if max_chars < ELLIPSIS.len() {
        return text[..cut].to_string();
    }
    let keep = text
        .char_indices()
        .nth(max_chars - ELLIPSIS.len())
        .map_or(cut, |(i, _)| i);
    format!("{}{ELLIPSIS}", &text[..keep])
}

/// Number of characters (not bytes) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
