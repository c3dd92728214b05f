//! Shared application state passed to every API handler.

use std::sync::Arc;

use discuss_context::ContextBuilder;
use discuss_domain::config::Config;
use discuss_orchestrator::{EventBus, Orchestrator};
use discuss_providers::ProviderRegistry;
use discuss_store::DiscussionStore;

/// Grounded on the teacher's `AppState` (`state.rs`): one `Arc`-wrapped
/// field per subsystem, grouped by concern, cheap to `Clone` since axum
/// extracts it per request.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,

    // ── Discussion runtime ───────────────────────────────────────────
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<DiscussionStore>,
    pub bus: Arc<EventBus>,
    pub context_builder: Arc<ContextBuilder>,
}
