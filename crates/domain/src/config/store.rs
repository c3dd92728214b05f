use serde::{Deserialize, Serialize};

/// Persistence Store (C3) tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory for `discussions/`, `backups/`, `metadata.json`.
    #[serde(default = "d_root")]
    pub root: String,
    #[serde(default = "d_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
    /// Number of most recent backups retained (spec §4.3 default 10).
    #[serde(default = "d_backup_retention")]
    pub backup_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: d_root(),
            autosave_interval_secs: d_autosave_interval_secs(),
            backup_retention: d_backup_retention(),
        }
    }
}

fn d_root() -> String {
    "./data/discussions".into()
}
fn d_autosave_interval_secs() -> u64 {
    30
}
fn d_backup_retention() -> usize {
    10
}
