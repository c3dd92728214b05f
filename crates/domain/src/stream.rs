//! Provider-agnostic streaming types, mirrored on `sa_domain::stream`.

use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk emitted by `CompleteStream` (spec §4.1).
///
/// Providers must deliver chunks in order and emit `done=true` exactly
/// once, even on error (after which they fail the outer call).
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    pub usage: Option<Usage>,
}
