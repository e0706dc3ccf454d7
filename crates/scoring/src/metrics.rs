//! Answer matching.

use std::collections::HashSet;

/// Lowercase, trim, then drop everything but `a-z`, `0-9` and spaces.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// Loose answer equality.
///
/// After [`normalize`], two strings match when the word set of one is a
/// subset of the other's, or when one is a substring of the other. An empty
/// string therefore matches everything.
pub fn fuzzy_match(candidate: &str, answer: &str) -> bool {
    let a = normalize(candidate);
    let b = normalize(answer);

    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();

    a_words.is_subset(&b_words) || b_words.is_subset(&a_words) || b.contains(&a) || a.contains(&b)
}

/// [`fuzzy_match`] against a list of acceptable answers.
pub fn fuzzy_match_any<S: AsRef<str>>(candidate: &str, answers: &[S]) -> bool {
    answers.iter().any(|answer| fuzzy_match(candidate, answer.as_ref()))
}
