use serde::{Deserialize, Serialize};

/// Provider Abstraction (C1) tunables: which local daemon to probe and
/// which remote providers to register (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub local: LocalProviderConfig,
    #[serde(default)]
    pub remote: Vec<RemoteProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_local_id")]
    pub id: String,
    #[serde(default = "d_candidate_ports")]
    pub candidate_ports: Vec<u16>,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self { enabled: true, id: d_local_id(), candidate_ports: d_candidate_ports() }
    }
}

/// A cloud provider, routed to via the `<id>/<model>` prefix convention.
/// `api_key_env` names the environment variable holding the bearer token;
/// a provider whose variable is unset or empty is recorded as an init
/// error rather than aborting startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProviderConfig {
    pub id: String,
    pub base_url: String,
    pub api_key_env: String,
}

fn d_true() -> bool {
    true
}
fn d_local_id() -> String {
    "local".into()
}
fn d_candidate_ports() -> Vec<u16> {
    vec![11434, 8080, 5000, 1234]
}
