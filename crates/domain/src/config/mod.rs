mod context;
mod orchestrator;
mod providers;
mod server;
mod store;
mod summary;

pub use context::*;
pub use orchestrator::*;
pub use providers::*;
pub use server::*;
pub use store::*;
pub use summary::*;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from an optional TOML file merged over
/// built-in defaults — same layering as the teacher's `sa_domain::config::
/// Config` (one `#[serde(default)]` sub-struct per concern).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Load from a TOML file if present, else built-in defaults. Matches
    /// the teacher's "best-effort file, defaults otherwise" pattern.
    pub fn load(path: Option<&std::path::Path>) -> crate::error::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| crate::error::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_toml() {
        let cfg = Config::default();
        let s = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.orchestrator.max_retries, cfg.orchestrator.max_retries);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load(Some(std::path::Path::new("/nonexistent/path.toml"))).unwrap();
        assert_eq!(cfg.orchestrator.model_delay_ms, 50);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_str = r#"
            [orchestrator]
            max_retries = 5
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.orchestrator.max_retries, 5);
        assert_eq!(cfg.orchestrator.model_delay_ms, 50);
        assert_eq!(cfg.context.max_context_messages, 12);
    }
}
