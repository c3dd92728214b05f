//! Token estimation without a tokenizer dependency (spec §4.4).

use discuss_domain::config::TokenEstimationConfig;

/// `max(ceil(chars/chars_per_token), ceil(words/tokens_per_word)) * safety_margin`,
/// floored to a minimum of 1.
pub fn estimate(text: &str, cfg: &TokenEstimationConfig) -> u32 {
    let chars = text.chars().count() as f64;
    let words = text.split_whitespace().count() as f64;

    let by_chars = (chars / cfg.chars_per_token).ceil();
    let by_words = (words / cfg.tokens_per_word).ceil();
    let raw = by_chars.max(by_words) * cfg.safety_margin;

    (raw.ceil() as i64).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_never_zero_for_empty_text() {
        let cfg = TokenEstimationConfig::default();
        assert_eq!(estimate("", &cfg), 1);
    }

    #[test]
    fn estimate_scales_with_length() {
        let cfg = TokenEstimationConfig::default();
        let short = estimate("hello world", &cfg);
        let long = estimate(&"hello world ".repeat(50), &cfg);
        assert!(long > short);
    }

    #[test]
    fn estimate_uses_char_based_floor_for_long_words() {
        let cfg = TokenEstimationConfig::default();
        // One very long "word": char-based estimate should dominate.
        let text = "x".repeat(280);
        let est = estimate(&text, &cfg);
        // 280 / 2.8 = 100, * 1.10 = 110
        assert_eq!(est, 110);
    }
}
