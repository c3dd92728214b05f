//! Summary Generator (C7) — a ladder of increasingly simple approaches,
//! each with its own deadline, falling back to a system-generated summary
//! when every rung fails (spec §4.7).

use std::sync::Arc;
use std::time::Duration;

use discuss_context::ContextBuilder;
use discuss_domain::config::SummaryConfig;
use discuss_domain::event::DiscussionEvent;
use discuss_domain::model::{Discussion, DiscussionStatus, Summary};
use discuss_domain::stream::StreamChunk;
use discuss_providers::{ChatMessage, ChunkSink, CompletionOptions, ProviderRegistry};

use crate::event_bus::{EventBus, TokenThrottle};

pub struct SummaryGenerator {
    registry: Arc<ProviderRegistry>,
    bus: Arc<EventBus>,
    context_builder: Arc<ContextBuilder>,
    cfg: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        bus: Arc<EventBus>,
        context_builder: Arc<ContextBuilder>,
        cfg: SummaryConfig,
    ) -> Self {
        Self { registry, bus, context_builder, cfg }
    }

    /// Run the ladder against `discussion`, mutating it in place with the
    /// final `summary`, `status`, and (on total failure) `error`. Does not
    /// persist or publish `discussion_completed` — the caller (C6) does
    /// that once this returns, matching the teacher's "return, let the
    /// caller broadcast" convention.
    pub async fn generate(&self, discussion: &mut Discussion) -> Option<String> {
        self.bus.publish(DiscussionEvent::GeneratingSummary {
            discussion_id: discussion.id.clone(),
            summary_model: discussion.summary_model.clone(),
        });

        let model = discussion.summary_model.clone();

        let content = if let Some(c) = self.try_streaming(discussion, &model).await {
            Some(c)
        } else if let Some(c) = self.try_non_streaming(discussion, &model).await {
            Some(c)
        } else if let Some(c) = self.try_simple(discussion, &model).await {
            Some(c)
        } else {
            self.try_minimal(discussion, &model).await
        };

        match content {
            Some(content) => {
                discussion.summary = Some(Summary {
                    id: uuid::Uuid::new_v4().to_string(),
                    generated_by: model,
                    content,
                    generated_at: chrono::Utc::now(),
                    token_count: None,
                    fallback: false,
                });
                discussion.status = DiscussionStatus::Completed;
                discussion.completed_at = Some(chrono::Utc::now());
                discussion.touch();
                self.bus.publish(DiscussionEvent::SummaryComplete {
                    discussion_id: discussion.id.clone(),
                    summary: discussion.summary.clone().unwrap(),
                });
                None
            }
            None => {
                let warning = "summary generation failed on every rung; using a system-generated fallback".to_string();
                let fallback_content = format!(
                    "Discussion about \"{}\" completed with {} messages from models: {}. Summary generation \
                     encountered technical difficulties.",
                    discussion.topic,
                    discussion.messages.len(),
                    discussion.models.join(", ")
                );
                discussion.summary = Some(Summary {
                    id: uuid::Uuid::new_v4().to_string(),
                    generated_by: "system".into(),
                    content: fallback_content,
                    generated_at: chrono::Utc::now(),
                    token_count: None,
                    fallback: true,
                });
                discussion.error = Some(warning.clone());
                discussion.status = DiscussionStatus::Completed;
                discussion.completed_at = Some(chrono::Utc::now());
                discussion.touch();
                self.bus.publish(DiscussionEvent::SummaryComplete {
                    discussion_id: discussion.id.clone(),
                    summary: discussion.summary.clone().unwrap(),
                });
                Some(warning)
            }
        }
    }

    async fn try_streaming(&self, discussion: &Discussion, model: &str) -> Option<String> {
        let messages = self.context_builder.build_summary(discussion);
        let deadline = Duration::from_secs(self.cfg.streaming_deadline_secs);
        self.stream_rung(&discussion.id, model, &messages, deadline).await
    }

    async fn try_non_streaming(&self, discussion: &Discussion, model: &str) -> Option<String> {
        let messages = self.context_builder.build_summary(discussion);
        let deadline = Duration::from_secs(self.cfg.non_streaming_deadline_secs);
        self.complete_rung(model, &messages, deadline).await
    }

    async fn try_simple(&self, discussion: &Discussion, model: &str) -> Option<String> {
        let messages = vec![
            ChatMessage::system(format!(
                "Summarize the discussion about {} in 2-3 sentences.",
                discussion.topic
            )),
            ChatMessage::user(format!(
                "Participants: {}. Give a brief recap.",
                discussion.models.join(", ")
            )),
        ];
        let deadline = Duration::from_secs(self.cfg.simple_deadline_secs);
        self.complete_rung(model, &messages, deadline).await
    }

    async fn try_minimal(&self, discussion: &Discussion, model: &str) -> Option<String> {
        let messages = vec![ChatMessage::user(format!(
            "Summarize: {}. Keep it brief.",
            discussion.topic
        ))];
        let deadline = Duration::from_secs(self.cfg.minimal_deadline_secs);
        self.complete_rung(model, &messages, deadline).await
    }

    fn accept(&self, content: Option<String>) -> Option<String> {
        content.filter(|c| c.trim().chars().count() > self.cfg.min_length as usize)
    }

    async fn stream_rung(
        &self,
        discussion_id: &str,
        model: &str,
        messages: &[ChatMessage],
        deadline: Duration,
    ) -> Option<String> {
        let provider = self.registry.resolve(model).ok()?;
        let options = CompletionOptions::default();
        let bus = self.bus.clone();
        let discussion_id_owned = discussion_id.to_string();

        let mut full_content = String::new();
        let mut pending_delta = String::new();
        let mut chunk_seen = false;
        let mut throttle = TokenThrottle::new(10, 200);

        let fut = async {
            let sink: ChunkSink = Box::new(|chunk: StreamChunk| {
                if !chunk.content.is_empty() {
                    chunk_seen = true;
                    full_content.push_str(&chunk.content);
                    pending_delta.push_str(&chunk.content);
                    if throttle.tick() {
                        bus.publish(DiscussionEvent::SummaryToken {
                            discussion_id: discussion_id_owned.clone(),
                            token: std::mem::take(&mut pending_delta),
                            content: full_content.clone(),
                        });
                        bus.publish(DiscussionEvent::SummaryStreaming {
                            discussion_id: discussion_id_owned.clone(),
                            content: full_content.clone(),
                            is_complete: false,
                        });
                    }
                }
                if chunk.done {
                    // Always emitted, bypassing throttle — see turn_executor's
                    // identical fix for the reasoning.
                    bus.publish(DiscussionEvent::SummaryToken {
                        discussion_id: discussion_id_owned.clone(),
                        token: std::mem::take(&mut pending_delta),
                        content: full_content.clone(),
                    });
                    bus.publish(DiscussionEvent::SummaryStreaming {
                        discussion_id: discussion_id_owned.clone(),
                        content: full_content.clone(),
                        is_complete: true,
                    });
                }
            });
            provider.complete_stream(model, messages, &options, sink).await
        };

        let result = tokio::time::timeout(deadline, fut).await;
        match result {
            Ok(Ok(_)) if chunk_seen => self.accept(Some(full_content)),
            _ => None,
        }
    }

    async fn complete_rung(&self, model: &str, messages: &[ChatMessage], deadline: Duration) -> Option<String> {
        let provider = self.registry.resolve(model).ok()?;
        let options = CompletionOptions::default();
        let fut = provider.complete(model, messages, &options);
        match tokio::time::timeout(deadline, fut).await {
            Ok(Ok(result)) => self.accept(Some(result.content)),
            _ => None,
        }
    }
}
