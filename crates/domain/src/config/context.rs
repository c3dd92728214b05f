use serde::{Deserialize, Serialize};

/// Context Builder (C4) tunables.
///
/// `camelCase` on the wire: this struct doubles as the body of the
/// performance-config gateway endpoint (spec §6 `GET|PUT
/// /discussions/performance/config`), whose recognized option names are
/// given in camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    /// Base message cap before adaptive reduction (1..20).
    #[serde(default = "d_max_context_messages")]
    pub max_context_messages: usize,
    /// Legacy character cap (advisory).
    #[serde(default = "d_max_context_length")]
    pub max_context_length: usize,
    /// Per-model default token budget, used when a model has no explicit
    /// descriptor (spec §4.4).
    #[serde(default = "d_max_context_tokens")]
    pub max_context_tokens: u32,
    #[serde(default = "d_max_message_tokens")]
    pub max_message_tokens: u32,
    #[serde(default)]
    pub token_estimation: TokenEstimationConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_messages: d_max_context_messages(),
            max_context_length: d_max_context_length(),
            max_context_tokens: d_max_context_tokens(),
            max_message_tokens: d_max_message_tokens(),
            token_estimation: TokenEstimationConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEstimationConfig {
    #[serde(default = "d_chars_per_token")]
    pub chars_per_token: f64,
    #[serde(default = "d_tokens_per_word")]
    pub tokens_per_word: f64,
    #[serde(default = "d_safety_margin")]
    pub safety_margin: f64,
}

impl Default for TokenEstimationConfig {
    fn default() -> Self {
        Self {
            chars_per_token: d_chars_per_token(),
            tokens_per_word: d_tokens_per_word(),
            safety_margin: d_safety_margin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Enables shrinkage of the context budget as rounds accumulate.
    #[serde(default = "d_true")]
    pub adaptive_context_size: bool,
    /// Multiplier applied every `max_rounds_before_reduction` rounds (0.1..1.0).
    #[serde(default = "d_reduction_factor")]
    pub context_reduction_factor: f64,
    /// Round threshold at which shrinkage starts (1..20).
    #[serde(default = "d_max_rounds_before_reduction")]
    pub max_rounds_before_reduction: u32,
    /// Broadcast every K tokens (1..100).
    #[serde(default = "d_token_broadcast_throttle")]
    pub token_broadcast_throttle: u32,
    /// Or every T ms, whichever comes first (50..1000).
    #[serde(default = "d_streaming_update_interval_ms")]
    pub streaming_update_interval_ms: u64,
    /// Context-cache eviction interval.
    #[serde(default = "d_cache_cleanup_interval_secs")]
    pub cache_cleanup_interval_secs: u64,
    /// General in-memory cleanup interval (dedup/similarity caches).
    #[serde(default = "d_memory_cleanup_interval_secs")]
    pub memory_cleanup_interval_secs: u64,
    /// Max entries retained in the context-assembly cache.
    #[serde(default = "d_max_cache_size")]
    pub max_cache_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            adaptive_context_size: true,
            context_reduction_factor: d_reduction_factor(),
            max_rounds_before_reduction: d_max_rounds_before_reduction(),
            token_broadcast_throttle: d_token_broadcast_throttle(),
            streaming_update_interval_ms: d_streaming_update_interval_ms(),
            cache_cleanup_interval_secs: d_cache_cleanup_interval_secs(),
            memory_cleanup_interval_secs: d_memory_cleanup_interval_secs(),
            max_cache_size: d_max_cache_size(),
        }
    }
}

fn d_max_context_messages() -> usize {
    12
}
fn d_max_context_length() -> usize {
    8_000
}
fn d_max_context_tokens() -> u32 {
    4_000
}
fn d_max_message_tokens() -> u32 {
    500
}
fn d_chars_per_token() -> f64 {
    2.8
}
fn d_tokens_per_word() -> f64 {
    1.4
}
fn d_safety_margin() -> f64 {
    1.10
}
fn d_reduction_factor() -> f64 {
    0.8
}
fn d_max_rounds_before_reduction() -> u32 {
    5
}
fn d_token_broadcast_throttle() -> u32 {
    10
}
fn d_streaming_update_interval_ms() -> u64 {
    200
}
fn d_cache_cleanup_interval_secs() -> u64 {
    300
}
fn d_memory_cleanup_interval_secs() -> u64 {
    600
}
fn d_max_cache_size() -> usize {
    500
}
fn d_true() -> bool {
    true
}
