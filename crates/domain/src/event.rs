//! Event Bus payload types (spec §4.2).
//!
//! Mirrors the shape of `sa_gateway::runtime::runs::RunEvent` and
//! `sa_gateway::runtime::turn::TurnEvent`: a single tagged enum, JSON
//! serializable, broadcast fire-and-forget to subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Discussion, Message, Summary};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiscussionEvent {
    #[serde(rename = "discussion_started")]
    DiscussionStarted { discussion_id: String, topic: String, models: Vec<String> },

    #[serde(rename = "model_thinking")]
    ModelThinking { discussion_id: String, model: String, round: u32 },

    #[serde(rename = "message_started")]
    MessageStarted { discussion_id: String, message_id: String, model: String, round: u32 },

    #[serde(rename = "message_token")]
    MessageToken {
        discussion_id: String,
        message_id: String,
        token: String,
        content: String,
        count: u32,
    },

    #[serde(rename = "message_streaming")]
    MessageStreaming {
        discussion_id: String,
        message_id: String,
        content: String,
        is_complete: bool,
    },

    #[serde(rename = "message_complete")]
    MessageComplete {
        discussion_id: String,
        message: Message,
        token_count: u32,
    },

    #[serde(rename = "round_completed")]
    RoundCompleted { discussion_id: String, round: u32, total_rounds: u32 },

    #[serde(rename = "generating_summary")]
    GeneratingSummary { discussion_id: String, summary_model: String },

    #[serde(rename = "summary_token")]
    SummaryToken { discussion_id: String, token: String, content: String },

    #[serde(rename = "summary_streaming")]
    SummaryStreaming { discussion_id: String, content: String, is_complete: bool },

    #[serde(rename = "summary_complete")]
    SummaryComplete { discussion_id: String, summary: Summary },

    #[serde(rename = "discussion_completed")]
    DiscussionCompleted {
        discussion_id: String,
        summary: Summary,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    #[serde(rename = "discussion_stopped")]
    DiscussionStopped { discussion_id: String },

    #[serde(rename = "discussion_deleted")]
    DiscussionDeleted { discussion_id: String },

    #[serde(rename = "discussion_error")]
    DiscussionError { discussion_id: String, error: String },
}

impl DiscussionEvent {
    pub fn discussion_id(&self) -> &str {
        match self {
            Self::DiscussionStarted { discussion_id, .. }
            | Self::ModelThinking { discussion_id, .. }
            | Self::MessageStarted { discussion_id, .. }
            | Self::MessageToken { discussion_id, .. }
            | Self::MessageStreaming { discussion_id, .. }
            | Self::MessageComplete { discussion_id, .. }
            | Self::RoundCompleted { discussion_id, .. }
            | Self::GeneratingSummary { discussion_id, .. }
            | Self::SummaryToken { discussion_id, .. }
            | Self::SummaryStreaming { discussion_id, .. }
            | Self::SummaryComplete { discussion_id, .. }
            | Self::DiscussionCompleted { discussion_id, .. }
            | Self::DiscussionStopped { discussion_id }
            | Self::DiscussionDeleted { discussion_id }
            | Self::DiscussionError { discussion_id, .. } => discussion_id,
        }
    }
}

/// Envelope wrapping every event with a timestamp, matching the WebSocket
/// frame shape fixed by spec §6 ("Event channel").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DiscussionEvent,
}

impl EventEnvelope {
    pub fn new(event: DiscussionEvent) -> Self {
        Self { timestamp: Utc::now(), event }
    }
}

/// `discussion_started` summary payload (spec §4.2).
pub fn discussion_summary(d: &Discussion) -> DiscussionEvent {
    DiscussionEvent::DiscussionStarted {
        discussion_id: d.id.clone(),
        topic: d.topic.clone(),
        models: d.models.clone(),
    }
}
