//! Trigger phrase matching: case-insensitive substring containment over
//! normalized text.

/// Lowercase, strip punctuation and collapse whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Does `heard` contain `phrase`? Both sides are normalized first, so the
/// test is insensitive to case, punctuation and extra whitespace. An empty
/// phrase never matches.
pub fn phrase_matches(phrase: &str, heard: &str) -> bool {
    let phrase = normalize(phrase);
    if phrase.is_empty() {
        return false;
    }
    normalize(heard).contains(&phrase)
}
