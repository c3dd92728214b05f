//! Core entities: Discussion, Message, Summary, IndexEntry.
//!
//! These are plain value objects. The Orchestrator (C6) owns the live,
//! in-memory copies; the Persistence Store (C3) owns the on-disk copies.
//! See `sa_gateway::runtime::runs::Run` for the teacher's analogous
//! "value object mutated in place, (de)serialized wholesale" pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    Created,
    Running,
    Summarizing,
    Completed,
    Stopped,
    Error,
}

impl DiscussionStatus {
    /// Active-set membership ≡ status ∈ {running, summarizing} (spec §4.6).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Summarizing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    /// Absent only for the synthetic system intro message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Absent for the system intro; 1-indexed for assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
}

impl Message {
    pub fn system_intro(topic: &str, models: &[String]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::System,
            model_name: None,
            round: None,
            content: format!(
                "This is a discussion about \"{topic}\" between the following participants: {}.",
                models.join(", ")
            ),
            timestamp: Utc::now(),
            token_count: None,
        }
    }

    /// Placeholder assistant message created before the Turn Executor fills
    /// it in (spec §4.6 step 5). Content is mutated in place by C5.
    pub fn placeholder(model_name: &str, round: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            model_name: Some(model_name.to_string()),
            round: Some(round),
            content: String::new(),
            timestamp: Utc::now(),
            token_count: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    /// Model id, or the literal "system" for the fallback summary.
    pub generated_by: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    pub fallback: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Discussion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: String,
    pub topic: String,
    pub models: Vec<String>,
    pub summary_model: String,
    pub max_rounds: u32,
    #[serde(default)]
    pub current_round: u32,
    #[serde(default)]
    pub current_model_index: usize,
    pub status: DiscussionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Request shape for creating a discussion (spec §4.6 "Create").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscussionRequest {
    pub topic: String,
    pub models: Vec<String>,
    pub summary_model: String,
    pub max_rounds: u32,
}

impl Discussion {
    pub const MIN_MODELS: usize = 2;
    pub const MAX_ROUNDS_LIMIT: u32 = 20;

    /// Validate + construct a new `created` discussion. Does not persist.
    pub fn create(req: CreateDiscussionRequest) -> crate::error::Result<Self> {
        if req.topic.trim().is_empty() {
            return Err(crate::error::Error::Validation("topic must not be empty".into()));
        }
        if req.models.len() < Self::MIN_MODELS {
            return Err(crate::error::Error::Validation(format!(
                "at least {} models are required",
                Self::MIN_MODELS
            )));
        }
        if req.max_rounds < 1 || req.max_rounds > Self::MAX_ROUNDS_LIMIT {
            return Err(crate::error::Error::Validation(format!(
                "max_rounds must be between 1 and {}",
                Self::MAX_ROUNDS_LIMIT
            )));
        }
        if req.summary_model.trim().is_empty() {
            return Err(crate::error::Error::Validation("summary_model must not be empty".into()));
        }

        let now = Utc::now();
        let intro = Message::system_intro(&req.topic, &req.models);
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: req.topic,
            models: req.models,
            summary_model: req.summary_model,
            max_rounds: req.max_rounds,
            current_round: 0,
            current_model_index: 0,
            status: DiscussionStatus::Created,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
            summary: None,
            messages: vec![intro],
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Lightweight listing projection (spec §3 "Index Entry").
    pub fn to_index_entry(&self) -> IndexEntry {
        IndexEntry {
            id: self.id.clone(),
            topic: self.topic.clone(),
            status: self.status,
            models: self.models.clone(),
            summary_model: self.summary_model.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    pub topic: String,
    pub status: DiscussionStatus,
    pub models: Vec<String>,
    pub summary_model: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(models: Vec<&str>, max_rounds: u32) -> CreateDiscussionRequest {
        CreateDiscussionRequest {
            topic: "Is coffee healthy?".into(),
            models: models.into_iter().map(String::from).collect(),
            summary_model: "A".into(),
            max_rounds,
        }
    }

    #[test]
    fn create_rejects_empty_topic() {
        let mut r = req(vec!["A", "B"], 3);
        r.topic = "  ".into();
        assert!(Discussion::create(r).is_err());
    }

    #[test]
    fn create_rejects_too_few_models() {
        assert!(Discussion::create(req(vec!["A"], 3)).is_err());
    }

    #[test]
    fn create_rejects_bad_round_count() {
        assert!(Discussion::create(req(vec!["A", "B"], 0)).is_err());
        assert!(Discussion::create(req(vec!["A", "B"], 21)).is_err());
    }

    #[test]
    fn create_prepends_system_message() {
        let d = Discussion::create(req(vec!["A", "B"], 3)).unwrap();
        assert_eq!(d.messages.len(), 1);
        assert_eq!(d.messages[0].role, MessageRole::System);
        assert_eq!(d.status, DiscussionStatus::Created);
        assert!(d.messages[0].content.contains("coffee"));
    }

    #[test]
    fn active_set_membership() {
        assert!(DiscussionStatus::Running.is_active());
        assert!(DiscussionStatus::Summarizing.is_active());
        assert!(!DiscussionStatus::Created.is_active());
        assert!(!DiscussionStatus::Completed.is_active());
    }
}
