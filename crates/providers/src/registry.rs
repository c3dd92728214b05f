//! Provider registry — routes a model identifier to the provider that
//! serves it, and tracks which providers failed to initialize.
//!
//! Grounded on `sa_providers::registry::ProviderRegistry`: providers are
//! registered eagerly, a provider that fails to construct (missing API
//! key, bad config) is recorded rather than aborting startup, and any
//! message that might carry a secret is masked before it reaches logs.

use std::collections::HashMap;
use std::sync::Arc;

use discuss_domain::config::ProvidersConfig;
use discuss_domain::error::{Error, Result};

use crate::local::LocalProvider;
use crate::remote::RemoteProvider;
use crate::traits::LlmProvider;
use crate::util::is_remote_model;

/// One entry per provider that failed to come up, kept for `doctor`-style
/// diagnostics and surfaced through health checks rather than a panic.
#[derive(Debug, Clone)]
pub struct InitError {
    pub provider_id: String,
    pub message: String,
}

pub struct ProviderRegistry {
    local: Option<Arc<dyn LlmProvider>>,
    remote: HashMap<String, Arc<dyn LlmProvider>>,
    init_errors: Vec<InitError>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { local: None, remote: HashMap::new(), init_errors: Vec::new() }
    }

    /// Build the registry from configuration: the local daemon (if
    /// enabled) and every remote provider whose API key env var resolves.
    /// A provider that fails to come up is recorded in `init_errors`
    /// rather than aborting startup (spec §4.1, §7 "Provider" errors).
    pub fn from_config(cfg: &ProvidersConfig) -> Self {
        let mut registry = Self::new();

        if cfg.local.enabled {
            registry.set_local(Arc::new(LocalProvider::with_ports(
                cfg.local.id.clone(),
                cfg.local.candidate_ports.clone(),
            )));
        }

        for remote in &cfg.remote {
            match std::env::var(&remote.api_key_env) {
                Ok(key) if !key.is_empty() => {
                    registry.register_remote(Arc::new(RemoteProvider::new(
                        remote.id.clone(),
                        remote.base_url.clone(),
                        key,
                    )));
                    tracing::info!(provider_id = %remote.id, "registered remote LLM provider");
                }
                _ => {
                    registry.record_init_error(
                        remote.id.clone(),
                        format!("environment variable {} is unset or empty", remote.api_key_env),
                    );
                    tracing::warn!(provider_id = %remote.id, "remote provider not initialized, missing API key");
                }
            }
        }

        registry
    }

    pub fn set_local(&mut self, provider: Arc<dyn LlmProvider>) {
        self.local = Some(provider);
    }

    pub fn register_remote(&mut self, provider: Arc<dyn LlmProvider>) {
        self.remote.insert(provider.provider_id().to_string(), provider);
    }

    pub fn record_init_error(&mut self, provider_id: impl Into<String>, message: impl Into<String>) {
        let message = mask_secrets(&message.into());
        self.init_errors.push(InitError { provider_id: provider_id.into(), message });
    }

    pub fn init_errors(&self) -> &[InitError] {
        &self.init_errors
    }

    /// Route a model identifier to its provider per the `/`-prefix
    /// convention (spec §4.1).
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn LlmProvider>> {
        if is_remote_model(model) {
            let provider_id = model.split_once('/').map(|(p, _)| p).unwrap_or(model);
            self.remote
                .get(provider_id)
                .cloned()
                .ok_or_else(|| Error::Provider {
                    provider: provider_id.to_string(),
                    message: "no remote provider registered for this prefix".into(),
                })
        } else {
            self.local.clone().ok_or_else(|| Error::Provider {
                provider: "local".into(),
                message: "no local provider configured".into(),
            })
        }
    }

    pub async fn list_all_models(&self) -> Vec<crate::traits::ModelDescriptor> {
        let mut out = Vec::new();
        if let Some(local) = &self.local {
            if let Ok(models) = local.list_models().await {
                out.extend(models);
            }
        }
        for provider in self.remote.values() {
            if let Ok(models) = provider.list_models().await {
                out.extend(models);
            }
        }
        out
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Redact anything that looks like a bearer token or API key from a
/// diagnostic string before it is logged or returned to a client.
pub fn mask_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for word in input.split_inclusive(' ') {
        let trimmed = word.trim_end();
        if trimmed.len() > 16
            && (trimmed.starts_with("sk-") || trimmed.starts_with("Bearer ") || trimmed.contains("key="))
        {
            out.push_str("***redacted***");
            out.push_str(&word[trimmed.len()..]);
        } else {
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalProvider;
    use std::sync::Arc;

    #[test]
    fn resolve_routes_by_prefix() {
        let mut reg = ProviderRegistry::new();
        reg.set_local(Arc::new(LocalProvider::new("local")));
        assert!(reg.resolve("llama3").is_ok());
        assert!(reg.resolve("cloud/gpt-4o").is_err());
    }

    #[test]
    fn mask_secrets_redacts_bearer_and_sk_tokens() {
        let masked = mask_secrets("using sk-abcdefghijklmnopqrstuvwxyz to authenticate");
        assert!(!masked.contains("abcdefghijklmnopqrstuvwxyz"));
        assert!(masked.contains("***redacted***"));
    }

    #[test]
    fn mask_secrets_leaves_ordinary_text_alone() {
        assert_eq!(mask_secrets("connection refused"), "connection refused");
    }

    #[test]
    fn from_config_records_error_for_missing_api_key_env() {
        let cfg = discuss_domain::config::ProvidersConfig {
            local: discuss_domain::config::LocalProviderConfig {
                enabled: false,
                id: "local".into(),
                candidate_ports: vec![],
            },
            remote: vec![discuss_domain::config::RemoteProviderConfig {
                id: "cloud".into(),
                base_url: "https://api.example.com".into(),
                api_key_env: "DISCUSS_TEST_DOES_NOT_EXIST_VAR".into(),
            }],
        };
        let registry = ProviderRegistry::from_config(&cfg);
        assert_eq!(registry.init_errors().len(), 1);
        assert_eq!(registry.init_errors()[0].provider_id, "cloud");
        assert!(registry.resolve("local-model").is_err());
    }

    #[test]
    fn record_init_error_is_retrievable() {
        let mut reg = ProviderRegistry::new();
        reg.record_init_error("cloud", "missing API key");
        assert_eq!(reg.init_errors().len(), 1);
        assert_eq!(reg.init_errors()[0].provider_id, "cloud");
    }
}
