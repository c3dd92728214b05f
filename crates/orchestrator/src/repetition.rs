//! Repetition detection for the Turn Executor's validation gate
//! (spec §4.5 step 4).

use std::collections::HashMap;

use discuss_context::similarity::{normalize, similarity};

const WORD_DOMINANCE_THRESHOLD: f64 = 0.15;
const SENTENCE_SIMILARITY_THRESHOLD: f64 = 0.8;
const MIN_WORD_LEN: usize = 3;
const MIN_SENTENCE_LEN: usize = 10;

/// A response is repetitive when any word longer than 3 characters makes
/// up more than 15% of all words, or two sentences longer than 10
/// characters are more than 80% similar.
pub fn is_repetitive(text: &str) -> bool {
    if word_dominance_exceeded(text) {
        return true;
    }
    sentence_similarity_exceeded(text)
}

fn word_dominance_exceeded(text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(normalize)
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < 4 {
        return false;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut eligible = 0usize;
    for w in &words {
        if w.chars().count() > MIN_WORD_LEN {
            *counts.entry(w.as_str()).or_insert(0) += 1;
            eligible += 1;
        }
    }
    if eligible == 0 {
        return false;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    (max as f64 / words.len() as f64) > WORD_DOMINANCE_THRESHOLD
}

fn sentence_similarity_exceeded(text: &str) -> bool {
    let sentences: Vec<String> = text
        .split(['.', '!', '?'])
        .map(|s| normalize(s))
        .filter(|s| s.chars().count() > MIN_SENTENCE_LEN)
        .collect();

    for i in 0..sentences.len() {
        for j in (i + 1)..sentences.len() {
            if similarity(&sentences[i], &sentences[j]) > SENTENCE_SIMILARITY_THRESHOLD {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dominant_word_repetition() {
        let text = "important important important important is a key concept here today";
        assert!(is_repetitive(text));
    }

    #[test]
    fn accepts_varied_prose() {
        let text = "Coffee consumption has been linked to both benefits and risks in the literature.";
        assert!(!is_repetitive(text));
    }

    #[test]
    fn rejects_near_identical_sentences() {
        let text = "Coffee is good for your health overall. Coffee is good for your health in general.";
        assert!(is_repetitive(text));
    }

    #[test]
    fn short_text_is_never_flagged_by_word_dominance() {
        assert!(!word_dominance_exceeded("short text"));
    }
}
