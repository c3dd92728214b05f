//! `metadata.json` — schema version, lifetime counters, last-backup time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub stopped: u64,
    #[serde(default)]
    pub errored: u64,
    #[serde(default)]
    pub deleted: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self { created: 0, completed: 0, stopped: 0, errored: 0, deleted: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_at: Option<DateTime<Utc>>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Metadata {
    fn default() -> Self {
        Self { schema_version: SCHEMA_VERSION, counters: Counters::default(), last_backup_at: None }
    }
}
