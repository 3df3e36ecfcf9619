//! Canonical form for noisy extracted text before it is used as a query.

/// Punctuation that separates words rather than belonging to them.
const SEPARATORS: [char; 8] = ['_', '-', '/', '\\', '.', ',', ':', ';'];

/// Lower-case `raw`, turn separators into spaces, drop everything that is
/// not a letter, digit or whitespace (any script), then collapse and trim
/// whitespace.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || SEPARATORS.contains(&ch) {
            cleaned.push(' ');
        } else if ch.is_alphanumeric() {
            cleaned.push(ch);
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace tokens of `normalize(raw)` longer than `min_chars` characters.
pub fn significant_tokens(raw: &str, min_chars: usize) -> Vec<String> {
    normalize(raw)
        .split(' ')
        .filter(|t| t.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}
