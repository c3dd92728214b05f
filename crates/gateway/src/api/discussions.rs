//! Discussion CRUD + lifecycle endpoints (spec §6 REST surface).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use discuss_domain::model::{CreateDiscussionRequest, Discussion, DiscussionStatus, IndexEntry, Message, Summary};

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateDiscussionRequest>,
) -> Result<Response, ApiError> {
    let discussion = state.orchestrator.create(req)?;
    Ok((StatusCode::CREATED, Json(discussion)).into_response())
}

pub async fn start(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Discussion>, ApiError> {
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    if discussion.status.is_active() {
        return Err(ApiError::conflict("discussion is already active"));
    }
    state.orchestrator.start(&id)?;
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    Ok(Json(discussion))
}

pub async fn stop(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    if state.orchestrator.get(&id)?.is_none() {
        return Err(ApiError::not_found(format!("discussion {id} not found")));
    }
    state.orchestrator.stop(&id)?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<IndexEntry>> {
    Json(state.orchestrator.list())
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Discussion>, ApiError> {
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    Ok(Json(discussion))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    state.orchestrator.delete(&id)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagesPage {
    page: usize,
    limit: usize,
    total: usize,
    messages: Vec<Message>,
}

pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<MessagesQuery>,
) -> Result<Json<MessagesPage>, ApiError> {
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(50).max(1);
    let total = discussion.messages.len();
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);
    let messages = discussion.messages[start..end].to_vec();
    Ok(Json(MessagesPage { page, limit, total, messages }))
}

pub async fn summary(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Summary>, ApiError> {
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    discussion.summary.ok_or_else(|| ApiError::not_found(format!("discussion {id} has no summary yet"))).map(Json)
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
}

pub async fn export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let discussion = state.orchestrator.get(&id)?.ok_or_else(|| ApiError::not_found(format!("discussion {id} not found")))?;
    if discussion.status != DiscussionStatus::Completed {
        return Err(ApiError::Conflict(format!("discussion {id} is not completed")));
    }

    match q.format.as_deref().unwrap_or("json") {
        "txt" => Ok((
            [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            render_txt(&discussion),
        )
            .into_response()),
        _ => Ok(Json(discussion).into_response()),
    }
}

/// Fixed human-readable layout: header block, per-message blocks, final
/// summary block (spec §6 `export?format=txt`).
fn render_txt(discussion: &Discussion) -> String {
    let mut out = String::new();
    out.push_str(&format!("Discussion: {}\n", discussion.topic));
    out.push_str(&format!("Participants: {}\n", discussion.models.join(", ")));
    out.push_str(&format!("Rounds: {}\n", discussion.max_rounds));
    out.push_str(&format!("Created: {}\n", discussion.created_at.to_rfc3339()));
    out.push_str(&format!("Completed: {}\n", discussion.completed_at.map(|t| t.to_rfc3339()).unwrap_or_default()));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for message in &discussion.messages {
        match message.role {
            discuss_domain::model::MessageRole::System => {
                out.push_str(&format!("\n[System] {}\n", message.content));
            }
            discuss_domain::model::MessageRole::Assistant => {
                out.push_str(&format!(
                    "\n[Round {}] {}:\n{}\n",
                    message.round.unwrap_or(0),
                    message.model_name.as_deref().unwrap_or("unknown"),
                    message.content
                ));
            }
        }
    }

    out.push('\n');
    out.push_str(&"=".repeat(60));
    out.push('\n');
    if let Some(summary) = &discussion.summary {
        out.push_str(&format!("\nSummary (by {}):\n{}\n", summary.generated_by, summary.content));
        if summary.fallback {
            out.push_str("\n(fallback summary — generation failed on every rung)\n");
        }
    }
    out
}
