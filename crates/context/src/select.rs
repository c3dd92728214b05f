//! History selection algorithm (spec §4.4 "History selection algorithm").

use discuss_domain::config::TokenEstimationConfig;
use discuss_domain::model::{Message, MessageRole};

use crate::similarity::is_near_duplicate;
use crate::tokens::estimate;

/// Reserved headroom for the user prompt text itself.
pub const USER_PROMPT_RESERVE_TOKENS: u32 = 200;

const HARD_ERROR_MARKER: &str = "[Error:";
const REASONING_OPEN: &str = "<think>";
const REASONING_CLOSE: &str = "</think>";

/// Per-turn budget, already adjusted for adaptive shrinkage.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub max_context_tokens: u32,
    pub max_message_tokens: u32,
    pub max_messages: usize,
}

fn passes_filter(message: &Message) -> bool {
    if message.role == MessageRole::System {
        return false;
    }
    let content = message.content.trim();
    if content.is_empty() {
        return false;
    }
    if content.contains(HARD_ERROR_MARKER) {
        return false;
    }
    if content.contains(REASONING_OPEN) && !content.contains(REASONING_CLOSE) {
        return false;
    }
    true
}

/// Select, format, and budget-fit history lines in chronological order.
/// Returns an empty vec when nothing fits (caller falls back to a bare
/// phase prompt per spec §4.4 step 5).
pub fn select_history(messages: &[Message], budget: &TokenBudget, cfg: &TokenEstimationConfig) -> Vec<String> {
    let filtered: Vec<&Message> = messages.iter().filter(|m| passes_filter(m)).collect();

    let mut deduped: Vec<&Message> = Vec::with_capacity(filtered.len());
    for m in filtered {
        let is_dup = deduped.iter().any(|kept| is_near_duplicate(&kept.content, &m.content));
        if !is_dup {
            deduped.push(m);
        }
    }

    let max_chars = ((budget.max_message_tokens as f64) * cfg.chars_per_token).floor().max(1.0) as usize;
    let mut running_tokens: u32 = 0;
    let mut selected_rev: Vec<String> = Vec::new();

    for m in deduped.iter().rev() {
        if selected_rev.len() >= budget.max_messages {
            break;
        }

        let model = m.model_name.as_deref().unwrap_or("a participant");
        let content = if m.content.chars().count() > max_chars {
            let truncated: String = m.content.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{truncated}…")
        } else {
            m.content.clone()
        };
        let formatted = format!("{model} contributed: {content}");
        let formatted_tokens = estimate(&formatted, cfg);

        if running_tokens + formatted_tokens + USER_PROMPT_RESERVE_TOKENS > budget.max_context_tokens {
            break;
        }
        running_tokens += formatted_tokens;
        selected_rev.push(formatted);
    }

    selected_rev.reverse();
    selected_rev
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(model: &str, content: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            model_name: Some(model.to_string()),
            round: Some(1),
            content: content.to_string(),
            timestamp: Utc::now(),
            token_count: None,
        }
    }

    fn sys(content: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::System,
            model_name: None,
            round: None,
            content: content.to_string(),
            timestamp: Utc::now(),
            token_count: None,
        }
    }

    #[test]
    fn drops_system_and_empty_and_error_sentinel_messages() {
        let messages = vec![
            sys("intro"),
            msg("a", ""),
            msg("b", "[Error: b failed to respond after retries]"),
            msg("c", "a real contribution"),
        ];
        let budget = TokenBudget { max_context_tokens: 4000, max_message_tokens: 500, max_messages: 12 };
        let selected = select_history(&messages, &budget, &TokenEstimationConfig::default());
        assert_eq!(selected.len(), 1);
        assert!(selected[0].contains("a real contribution"));
    }

    #[test]
    fn dedupes_near_identical_contributions() {
        let messages = vec![
            msg("a", "Coffee has real health benefits."),
            msg("b", "coffee has real health benefits"),
            msg("c", "Something entirely different."),
        ];
        let budget = TokenBudget { max_context_tokens: 4000, max_message_tokens: 500, max_messages: 12 };
        let selected = select_history(&messages, &budget, &TokenEstimationConfig::default());
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn stops_once_budget_exhausted() {
        let messages: Vec<Message> = (0..20).map(|i| msg("a", &format!("contribution number {i}"))).collect();
        let budget = TokenBudget { max_context_tokens: 60, max_message_tokens: 500, max_messages: 20 };
        let selected = select_history(&messages, &budget, &TokenEstimationConfig::default());
        assert!(selected.len() < 20);
    }

    #[test]
    fn truncates_overlong_single_message() {
        let long_content = "word ".repeat(500);
        let messages = vec![msg("a", long_content.trim())];
        let budget = TokenBudget { max_context_tokens: 4000, max_message_tokens: 10, max_messages: 12 };
        let selected = select_history(&messages, &budget, &TokenEstimationConfig::default());
        assert_eq!(selected.len(), 1);
        assert!(selected[0].ends_with('…'));
    }

    #[test]
    fn preserves_chronological_order_in_output() {
        let messages = vec![msg("a", "first"), msg("b", "second"), msg("c", "third")];
        let budget = TokenBudget { max_context_tokens: 4000, max_message_tokens: 500, max_messages: 12 };
        let selected = select_history(&messages, &budget, &TokenEstimationConfig::default());
        assert!(selected[0].contains("first"));
        assert!(selected[2].contains("third"));
    }
}
