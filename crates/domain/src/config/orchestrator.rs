use serde::{Deserialize, Serialize};

/// Turn-loop and Turn Executor tunables (spec §6 configuration list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// ms between consecutive turns (0..5000).
    #[serde(default = "d_model_delay")]
    pub model_delay_ms: u64,
    /// Enforces at-most-one model in flight per discussion.
    #[serde(default = "d_true")]
    pub single_model_mode: bool,
    /// Extra attempts per turn beyond the first (0..N).
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Minimum accepted response length in characters.
    #[serde(default = "d_min_response_length")]
    pub min_response_length: usize,
    /// When false, the Turn Executor skips the streaming path entirely.
    #[serde(default = "d_true")]
    pub enable_streaming: bool,
    /// Outer deadline for one turn's provider call (spec §5).
    #[serde(default = "d_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    /// Seconds to wait for the single-model-mode slot before force-clearing
    /// (spec §4.6 step 2: 60 * 500ms = 30s).
    #[serde(default = "d_single_model_wait_secs")]
    pub single_model_wait_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_delay_ms: d_model_delay(),
            single_model_mode: true,
            max_retries: d_max_retries(),
            min_response_length: d_min_response_length(),
            enable_streaming: true,
            turn_timeout_secs: d_turn_timeout_secs(),
            single_model_wait_secs: d_single_model_wait_secs(),
        }
    }
}

fn d_model_delay() -> u64 {
    50
}
fn d_max_retries() -> u32 {
    2
}
fn d_min_response_length() -> usize {
    20
}
fn d_turn_timeout_secs() -> u64 {
    300
}
fn d_single_model_wait_secs() -> u64 {
    30
}
fn d_true() -> bool {
    true
}
