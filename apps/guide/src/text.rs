//! Tokenization helpers shared by the scoring stages (scope gate, ranker, guard).

use std::collections::HashSet;

/// Words ignored when measuring how much two texts have in common.
///
/// Includes the usual function words plus generic praise adjectives
/// ("famous", "popular", "best"), which models add freely and which say
/// nothing about whether a claim comes from the reference.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "can", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your",
    "his", "its", "our", "their", "here", "there", "where", "when", "why", "how", "what", "who",
    "which", "very", "much", "many", "most", "more", "some", "any", "all", "each", "every", "no",
    "not", "only", "just", "also", "even", "still", "well", "good", "great", "best", "better",
    "nice", "popular", "famous", "known", "called",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercase ASCII-alphabetic tokens minus stop words.
///
/// Digits and punctuation split tokens, so "isn't" yields "isn" and "t".
pub fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Lowercase word tokens (letters, digits, underscore) minus stop words.
///
/// Keeps tokens like "6am" intact, which the ranker needs for time matching.
pub fn word_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// True if `needle` occurs in `haystack` with no word character on either side.
/// Both arguments are expected to be lowercase already.
pub fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}
