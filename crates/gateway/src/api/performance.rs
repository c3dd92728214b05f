//! Runtime-tunable context/performance configuration (spec §6
//! `GET|PUT /discussions/performance/config`, `POST
//! /discussions/performance/optimize`).

use axum::extract::{Path, State};
use axum::Json;

use discuss_domain::config::{ContextConfig, PerformanceConfig, TokenEstimationConfig};

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn get_config(State(state): State<AppState>) -> Json<ContextConfig> {
    Json(state.context_builder.config())
}

pub async fn put_config(
    State(state): State<AppState>,
    Json(cfg): Json<ContextConfig>,
) -> Json<ContextConfig> {
    state.context_builder.set_config(cfg.clone());
    Json(cfg)
}

pub async fn optimize(
    State(state): State<AppState>,
    Path(mode): Path<String>,
) -> Result<Json<ContextConfig>, ApiError> {
    let cfg = match mode.as_str() {
        "fast" => fast_preset(),
        "balanced" => ContextConfig::default(),
        "quality" => quality_preset(),
        other => return Err(ApiError::BadRequest(format!("unknown optimization mode: {other}"))),
    };
    state.context_builder.set_config(cfg.clone());
    Ok(Json(cfg))
}

/// Favors aggressive context shrinkage and fewer, coarser broadcasts —
/// cheapest path per round.
fn fast_preset() -> ContextConfig {
    ContextConfig {
        max_context_messages: 6,
        max_context_tokens: 2_000,
        max_message_tokens: 300,
        performance: PerformanceConfig {
            adaptive_context_size: true,
            context_reduction_factor: 0.6,
            max_rounds_before_reduction: 2,
            token_broadcast_throttle: 20,
            streaming_update_interval_ms: 400,
            ..ContextConfig::default().performance
        },
        token_estimation: TokenEstimationConfig::default(),
        ..ContextConfig::default()
    }
}

/// Favors a larger context window and finer-grained streaming, at the
/// cost of more tokens spent per round.
fn quality_preset() -> ContextConfig {
    ContextConfig {
        max_context_messages: 20,
        max_context_tokens: 8_000,
        max_message_tokens: 800,
        performance: PerformanceConfig {
            adaptive_context_size: false,
            token_broadcast_throttle: 5,
            streaming_update_interval_ms: 100,
            ..ContextConfig::default().performance
        },
        token_estimation: TokenEstimationConfig::default(),
        ..ContextConfig::default()
    }
}
