use serde::{Deserialize, Serialize};

/// Summary Generator (C7) ladder tunables (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "d_streaming_deadline_secs")]
    pub streaming_deadline_secs: u64,
    #[serde(default = "d_non_streaming_deadline_secs")]
    pub non_streaming_deadline_secs: u64,
    #[serde(default = "d_simple_deadline_secs")]
    pub simple_deadline_secs: u64,
    #[serde(default = "d_minimal_deadline_secs")]
    pub minimal_deadline_secs: u64,
    /// Wall-clock deadline used when the ladder is invoked from an outer
    /// caller that applies its own overall budget (spec §5: 90s).
    #[serde(default = "d_outer_deadline_secs")]
    pub outer_deadline_secs: u64,
    /// Minimum accepted content length (spec §4.7 success condition).
    #[serde(default = "d_min_length")]
    pub min_length: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            streaming_deadline_secs: d_streaming_deadline_secs(),
            non_streaming_deadline_secs: d_non_streaming_deadline_secs(),
            simple_deadline_secs: d_simple_deadline_secs(),
            minimal_deadline_secs: d_minimal_deadline_secs(),
            outer_deadline_secs: d_outer_deadline_secs(),
            min_length: d_min_length(),
        }
    }
}

fn d_streaming_deadline_secs() -> u64 {
    60
}
fn d_non_streaming_deadline_secs() -> u64 {
    45
}
fn d_simple_deadline_secs() -> u64 {
    30
}
fn d_minimal_deadline_secs() -> u64 {
    20
}
fn d_outer_deadline_secs() -> u64 {
    90
}
fn d_min_length() -> usize {
    20
}
