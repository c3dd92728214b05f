//! `AppState` construction and background-task spawning, split out of
//! `main.rs` the way the teacher's `bootstrap.rs` does.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use discuss_context::ContextBuilder;
use discuss_domain::config::Config;
use discuss_orchestrator::{EventBus, Orchestrator};
use discuss_providers::ProviderRegistry;
use discuss_store::DiscussionStore;

use crate::state::AppState;

/// Wire every subsystem together and return a fully-built [`AppState`].
/// Shared by `serve` and `doctor`.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let store = Arc::new(
        DiscussionStore::open(Path::new(&config.store.root), config.store.backup_retention)
            .context("opening discussion store")?,
    );
    tracing::info!(root = %config.store.root, "discussion store ready");

    let bus = Arc::new(EventBus::new());

    let registry = Arc::new(ProviderRegistry::from_config(&config.providers));
    if !registry.init_errors().is_empty() {
        for err in registry.init_errors() {
            tracing::warn!(provider_id = %err.provider_id, error = %err.message, "provider failed to initialize");
        }
    }
    tracing::info!("LLM provider registry ready");

    let context_builder = Arc::new(ContextBuilder::new(config.context.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        bus.clone(),
        registry.clone(),
        context_builder.clone(),
        config.orchestrator.clone(),
        config.context.performance.token_broadcast_throttle,
        config.context.performance.streaming_update_interval_ms,
        config.summary.clone(),
    ));
    tracing::info!("orchestrator ready");

    Ok(AppState { config, registry, orchestrator, store, bus, context_builder })
}

/// Spawn the long-running background tasks: periodic autosave of every
/// active discussion (spec §4.3 `AutoSave`) and periodic context-cache
/// eviction (spec §4.4 "cache is purged periodically"). Call after
/// [`build_app_state`] only when serving over HTTP; one-shot CLI commands
/// skip this.
pub fn spawn_background_tasks(state: &AppState) {
    {
        let orchestrator = state.orchestrator.clone();
        let store = state.store.clone();
        let interval_secs = state.config.store.autosave_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let active = orchestrator.active_discussions();
                store.autosave(&active);
            }
        });
    }

    {
        let context_builder = state.context_builder.clone();
        tokio::spawn(async move {
            loop {
                let interval_secs = context_builder.config().performance.cache_cleanup_interval_secs.max(1);
                tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
                context_builder.purge_cache();
            }
        });
    }

    tracing::info!("background tasks spawned");
}
