//! Turn Executor (C5) — fills one placeholder message's content by driving
//! a provider through the streaming-primary / non-streaming-fallback
//! protocol (spec §4.5).
//!
//! Grounded on `sa_gateway::runtime::turn`'s event-emitting streaming loop,
//! generalized from a tool-calling chat turn to a single validated,
//! retried completion.

use std::sync::Arc;
use std::time::Duration;

use discuss_domain::config::OrchestratorConfig;
use discuss_domain::event::DiscussionEvent;
use discuss_domain::phase::Phase;
use discuss_domain::stream::StreamChunk;
use discuss_providers::{ChatMessage, ChunkSink, CompletionOptions, ProviderRegistry};

use crate::event_bus::{EventBus, TokenThrottle};
use crate::repetition::is_repetitive;

pub struct TurnExecutor {
    registry: Arc<ProviderRegistry>,
    bus: Arc<EventBus>,
    cfg: OrchestratorConfig,
    token_broadcast_throttle: u32,
    streaming_update_interval_ms: u64,
}

pub struct TurnOutcome {
    pub content: String,
    pub success: bool,
}

impl TurnExecutor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        bus: Arc<EventBus>,
        cfg: OrchestratorConfig,
        token_broadcast_throttle: u32,
        streaming_update_interval_ms: u64,
    ) -> Self {
        Self { registry, bus, cfg, token_broadcast_throttle, streaming_update_interval_ms }
    }

    /// Run the full protocol for one `(model, context)` turn, returning
    /// the final content and whether it was produced successfully (as
    /// opposed to the terminal error sentinel).
    pub async fn execute(
        &self,
        discussion_id: &str,
        message_id: &str,
        model: &str,
        round: u32,
        topic: &str,
        phase: Phase,
        context_messages: &[ChatMessage],
    ) -> TurnOutcome {
        self.bus.publish(DiscussionEvent::ModelThinking {
            discussion_id: discussion_id.to_string(),
            model: model.to_string(),
            round,
        });

        let options = CompletionOptions::default();

        for attempt in 0..=self.cfg.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }

            let messages_for_attempt: Vec<ChatMessage> = if attempt > 0 && context_messages.len() == 2 {
                vec![context_messages[0].clone(), ChatMessage::user(phase.fallback_prompt(topic))]
            } else {
                context_messages.to_vec()
            };

            let provider = match self.registry.resolve(model) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(model, error = %e, attempt, "provider resolution failed");
                    continue;
                }
            };

            let content = if self.cfg.enable_streaming {
                match self.try_stream(&provider, discussion_id, message_id, model, &messages_for_attempt, &options).await {
                    Some(content) if content.chars().count() as u32 >= self.cfg.min_response_length => Some(content),
                    _ => self.try_complete(&provider, model, &messages_for_attempt, &options).await,
                }
            } else {
                self.try_complete(&provider, model, &messages_for_attempt, &options).await
            };

            let Some(content) = content else {
                tracing::warn!(model, attempt, "turn attempt produced no content");
                continue;
            };

            if (content.chars().count() as u32) < self.cfg.min_response_length {
                tracing::debug!(model, attempt, "response below minimum length, retrying");
                continue;
            }

            if is_repetitive(&content) {
                if attempt < self.cfg.max_retries {
                    tracing::debug!(model, attempt, "repetitive response, retrying");
                    continue;
                }
                tracing::warn!(model, "accepting repetitive response after exhausting retries");
            }

            return TurnOutcome { content, success: true };
        }

        let sentinel = format!("[Error: {model} failed to respond after {} attempts]", self.cfg.max_retries + 1);
        TurnOutcome { content: sentinel, success: false }
    }

    async fn try_stream(
        &self,
        provider: &Arc<dyn discuss_providers::LlmProvider>,
        discussion_id: &str,
        message_id: &str,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Option<String> {
        let mut full_content = String::new();
        let mut pending_delta = String::new();
        let mut chunk_seen = false;
        let mut throttle = TokenThrottle::new(self.token_broadcast_throttle, self.streaming_update_interval_ms);

        let bus = self.bus.clone();
        let discussion_id_owned = discussion_id.to_string();
        let message_id_owned = message_id.to_string();

        {
            let sink: ChunkSink = Box::new(|chunk: StreamChunk| {
                if !chunk.content.is_empty() {
                    chunk_seen = true;
                    full_content.push_str(&chunk.content);
                    pending_delta.push_str(&chunk.content);
                    if throttle.tick() {
                        bus.publish(DiscussionEvent::MessageToken {
                            discussion_id: discussion_id_owned.clone(),
                            message_id: message_id_owned.clone(),
                            token: std::mem::take(&mut pending_delta),
                            content: full_content.clone(),
                            count: full_content.chars().count() as u32,
                        });
                        bus.publish(DiscussionEvent::MessageStreaming {
                            discussion_id: discussion_id_owned.clone(),
                            message_id: message_id_owned.clone(),
                            content: full_content.clone(),
                            is_complete: false,
                        });
                    }
                }
                if chunk.done {
                    // Always emitted, bypassing throttle, so the concatenation
                    // of every `message_token.token` fragment equals the final
                    // content (spec §4.2) even when the last chunk(s) landed
                    // between throttle emissions.
                    bus.publish(DiscussionEvent::MessageToken {
                        discussion_id: discussion_id_owned.clone(),
                        message_id: message_id_owned.clone(),
                        token: std::mem::take(&mut pending_delta),
                        content: full_content.clone(),
                        count: full_content.chars().count() as u32,
                    });
                    bus.publish(DiscussionEvent::MessageStreaming {
                        discussion_id: discussion_id_owned.clone(),
                        message_id: message_id_owned.clone(),
                        content: full_content.clone(),
                        is_complete: true,
                    });
                }
            });

            if let Err(e) = provider.complete_stream(model, messages, options, sink).await {
                tracing::debug!(model, error = %e, "streaming attempt failed");
                return None;
            }
        }

        if chunk_seen {
            Some(full_content)
        } else {
            None
        }
    }

    async fn try_complete(
        &self,
        provider: &Arc<dyn discuss_providers::LlmProvider>,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Option<String> {
        match provider.complete(model, messages, options).await {
            Ok(result) => Some(result.content),
            Err(e) => {
                tracing::debug!(model, error = %e, "non-streaming attempt failed");
                None
            }
        }
    }
}
