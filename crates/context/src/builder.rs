//! Context Builder (C4) — assembles the `[system, user]` pair handed to a
//! provider for one turn, with adaptive shrinkage and per-turn caching.

use std::collections::HashMap;

use discuss_domain::config::ContextConfig;
use discuss_domain::model::Discussion;
use discuss_domain::phase::Phase;
use parking_lot::{Mutex, RwLock};

use discuss_providers::ChatMessage;

use crate::select::{select_history, TokenBudget};

type CacheKey = (String, String, u32, usize);

pub struct ContextBuilder {
    cfg: RwLock<ContextConfig>,
    cache: Mutex<HashMap<CacheKey, Vec<ChatMessage>>>,
}

impl ContextBuilder {
    pub fn new(cfg: ContextConfig) -> Self {
        Self { cfg: RwLock::new(cfg), cache: Mutex::new(HashMap::new()) }
    }

    /// Current effective configuration, for the gateway's performance-config
    /// endpoint (spec §6 `GET /discussions/performance/config`).
    pub fn config(&self) -> ContextConfig {
        self.cfg.read().clone()
    }

    /// Replace the whole configuration at once (spec §6 `PUT
    /// /discussions/performance/config` and the `optimize` presets). Takes
    /// effect on the next `build` call; in-flight turns are unaffected.
    pub fn set_config(&self, cfg: ContextConfig) {
        *self.cfg.write() = cfg;
        self.cache.lock().clear();
    }

    /// Build the `[system, user]` messages for `model`'s next turn in
    /// `discussion`, using the cache keyed on (id, model, round, message
    /// count) per spec §4.4.
    pub fn build(&self, discussion: &Discussion, model: &str) -> Vec<ChatMessage> {
        let key: CacheKey = (
            discussion.id.clone(),
            model.to_string(),
            discussion.current_round,
            discussion.messages.len(),
        );

        if let Some(cached) = self.cache.lock().get(&key) {
            return cached.clone();
        }

        let cfg = self.cfg.read().clone();
        let phase = Phase::for_round(discussion.current_round, discussion.max_rounds);
        let budget = self.adaptive_budget(&cfg, discussion.current_round);
        let history = select_history(&discussion.messages, &budget, &cfg.token_estimation);

        let system = ChatMessage::system(system_prompt(discussion, model, phase));
        let user_content = if history.is_empty() {
            phase.fallback_prompt(&discussion.topic)
        } else {
            format!(
                "Here is the discussion so far:\n\n{}\n\n{}",
                history.join("\n\n"),
                phase.guideline()
            )
        };
        let messages = vec![system, ChatMessage::user(user_content)];

        let mut cache = self.cache.lock();
        if cache.len() >= cfg.performance.max_cache_size {
            tracing::debug!(size = cache.len(), "context cache at capacity, clearing");
            cache.clear();
        }
        cache.insert(key, messages.clone());
        messages
    }

    /// Apply spec §4.4 adaptive shrinkage: once `current_round` reaches the
    /// configured threshold, scale both the token budget and the message
    /// count cap by `reduction_factor ^ floor((round - threshold) / 5)`.
    fn adaptive_budget(&self, cfg: &ContextConfig, current_round: u32) -> TokenBudget {
        let perf = &cfg.performance;
        let mut max_tokens = cfg.max_context_tokens;
        let mut max_messages = cfg.max_context_messages;

        if perf.adaptive_context_size && current_round >= perf.max_rounds_before_reduction {
            let steps = (current_round - perf.max_rounds_before_reduction) / 5;
            let factor = perf.context_reduction_factor.powi(steps as i32);
            max_tokens = ((max_tokens as f64) * factor).round() as u32;
            max_messages = (((max_messages as f64) * factor).floor() as usize).max(3);
        }

        TokenBudget {
            max_context_tokens: max_tokens,
            max_message_tokens: cfg.max_message_tokens,
            max_messages,
        }
    }

    /// Build a reduced-budget `[system, user]` pair for the Summary
    /// Generator's streaming/non-streaming rungs (spec §4.7): 40% of the
    /// normal context-token budget (floor 1000), 60% of the per-message
    /// budget (floor 100), capped at the 5 most recent valid messages.
    pub fn build_summary(&self, discussion: &Discussion) -> Vec<ChatMessage> {
        const CONTEXT_TOKEN_FLOOR: u32 = 1000;
        const MESSAGE_TOKEN_FLOOR: u32 = 100;
        const MAX_SUMMARY_MESSAGES: usize = 5;

        let cfg = self.cfg.read().clone();
        let max_context_tokens = (((cfg.max_context_tokens as f64) * 0.4).round() as u32).max(CONTEXT_TOKEN_FLOOR);
        let max_message_tokens = (((cfg.max_message_tokens as f64) * 0.6).round() as u32).max(MESSAGE_TOKEN_FLOOR);
        let budget = TokenBudget { max_context_tokens, max_message_tokens, max_messages: MAX_SUMMARY_MESSAGES };
        let history = select_history(&discussion.messages, &budget, &cfg.token_estimation);

        let system = ChatMessage::system(format!(
            "Summarize the discussion about \"{}\" in 2-3 sentences, drawing on every participant's \
             contribution.",
            discussion.topic
        ));
        let user_content = if history.is_empty() {
            format!(
                "Summarize the discussion about {} between {}.",
                discussion.topic,
                discussion.models.join(", ")
            )
        } else {
            format!(
                "Discussion so far:\n\n{}\n\nProvide a concise summary.",
                history.join("\n\n")
            )
        };
        vec![system, ChatMessage::user(user_content)]
    }

    /// Periodic cache eviction (spec §4.4 "cache is purged periodically"),
    /// driven by `PerformanceConfig::cache_cleanup_interval_secs`.
    pub fn purge_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn token_estimation_config(&self) -> discuss_domain::config::TokenEstimationConfig {
        self.cfg.read().token_estimation.clone()
    }
}

fn system_prompt(discussion: &Discussion, model: &str, phase: Phase) -> String {
    let others: Vec<&str> = discussion
        .models
        .iter()
        .filter(|m| m.as_str() != model)
        .map(|s| s.as_str())
        .collect();
    format!(
        "You are {model}, participating in round {round} ({phase:?} phase) of a discussion on \"{topic}\" \
         alongside: {others}. {guideline}",
        round = discussion.current_round.max(1),
        topic = discussion.topic,
        others = others.join(", "),
        guideline = phase.guideline(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use discuss_domain::model::CreateDiscussionRequest;

    fn discussion() -> Discussion {
        Discussion::create(CreateDiscussionRequest {
            topic: "Is coffee healthy?".into(),
            models: vec!["a".into(), "b".into()],
            summary_model: "a".into(),
            max_rounds: 6,
        })
        .unwrap()
    }

    #[test]
    fn initial_round_falls_back_to_bare_prompt_with_no_history() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let d = discussion();
        let messages = builder.build(&d, "a");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("coffee") || messages[1].content.contains("Is coffee healthy?"));
    }

    #[test]
    fn repeated_build_hits_cache() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let d = discussion();
        let first = builder.build(&d, "a");
        let second = builder.build(&d, "a");
        assert_eq!(first[1].content, second[1].content);
        assert_eq!(builder.cache_len(), 1);
    }

    #[test]
    fn adaptive_shrinkage_reduces_token_budget_past_threshold() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let cfg = ContextConfig::default();
        let early = builder.adaptive_budget(&cfg, 1);
        let late = builder.adaptive_budget(&cfg, 10);
        assert!(late.max_context_tokens < early.max_context_tokens);
        assert!(late.max_messages >= 3);
    }

    #[test]
    fn set_config_replaces_cfg_and_clears_cache() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let d = discussion();
        builder.build(&d, "a");
        assert_eq!(builder.cache_len(), 1);

        let mut cfg = ContextConfig::default();
        cfg.max_context_messages = 3;
        builder.set_config(cfg.clone());

        assert_eq!(builder.cache_len(), 0);
        assert_eq!(builder.config().max_context_messages, 3);
    }

    #[test]
    fn build_summary_falls_back_when_no_history_fits() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let d = discussion();
        let messages = builder.build_summary(&d);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains(&d.topic));
    }

    #[test]
    fn purge_cache_clears_entries() {
        let builder = ContextBuilder::new(ContextConfig::default());
        let d = discussion();
        builder.build(&d, "a");
        assert_eq!(builder.cache_len(), 1);
        builder.purge_cache();
        assert_eq!(builder.cache_len(), 0);
    }
}
