use discuss_domain::error::Result;
use discuss_domain::stream::{BoxStream, Usage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// A message handed to a provider. The Context Builder (C4) produces a
/// `[system, user]` pair for every turn; providers never see more roles
/// than that (spec §4.1, §4.4).
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Per-call options; `None` lets the provider choose its own defaults.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Describes one model a provider can serve (spec §4.1 `ListModels`).
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub provider_id: String,
    pub model_id: String,
    pub display_name: String,
    pub context_length_hint: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub connected: bool,
    pub message: String,
}

/// A push function the provider delivers stream chunks to, in order,
/// terminating with exactly one `done=true` chunk (spec §4.1).
pub type ChunkSink<'a> = Box<dyn FnMut(discuss_domain::stream::StreamChunk) + Send + 'a>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait (spec §4.1 "Contract exposed to the Orchestrator")
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    async fn health(&self) -> HealthStatus;

    /// Single-shot completion; may block for seconds.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResult>;

    /// Streaming completion. `sink` is called once per chunk, in order,
    /// with exactly one terminal `done=true` chunk (even on error, the
    /// provider fails the outer call after emitting it). Returns the
    /// final usage, if the provider reported one.
    async fn complete_stream<'a>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        sink: ChunkSink<'a>,
    ) -> Result<Option<Usage>>;

    /// A unique identifier for this provider instance (matches the routing
    /// prefix convention in spec §4.1).
    fn provider_id(&self) -> &str;
}

/// Dummy helper kept for adapters that build their own SSE-backed streams
/// instead of driving a sink directly; unused by the two concrete
/// providers here but documents the alternative shape mentioned in
/// spec §9 ("callback-shaped streaming maps cleanly to ... an async
/// iterator").
pub type EventStream = BoxStream<'static, Result<discuss_domain::stream::StreamChunk>>;
