//! Orchestrator (C6) — owns every live Discussion and drives its turn
//! loop from creation through completion (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use discuss_context::ContextBuilder;
use discuss_domain::config::OrchestratorConfig;
use discuss_domain::error::{Error, Result};
use discuss_domain::event::{discussion_summary, DiscussionEvent};
use discuss_domain::model::{CreateDiscussionRequest, Discussion, DiscussionStatus, IndexEntry, Message};
use discuss_domain::phase::Phase;
use discuss_providers::ProviderRegistry;
use discuss_store::DiscussionStore;

use crate::event_bus::EventBus;
use crate::running_models::RunningModels;
use crate::summary::SummaryGenerator;
use crate::turn_executor::TurnExecutor;

pub struct Orchestrator {
    store: Arc<DiscussionStore>,
    bus: Arc<EventBus>,
    context_builder: Arc<ContextBuilder>,
    turn_executor: Arc<TurnExecutor>,
    summary_generator: Arc<SummaryGenerator>,
    running_models: RunningModels,
    cfg: OrchestratorConfig,
    /// Live, memory-owned discussions — "memory-owned" until status
    /// becomes terminal, per spec §4.1 ownership note.
    live: RwLock<HashMap<String, Discussion>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<DiscussionStore>,
        bus: Arc<EventBus>,
        registry: Arc<ProviderRegistry>,
        context_builder: Arc<ContextBuilder>,
        cfg: OrchestratorConfig,
        token_broadcast_throttle: u32,
        streaming_update_interval_ms: u64,
        summary_cfg: discuss_domain::config::SummaryConfig,
    ) -> Self {
        let turn_executor = Arc::new(TurnExecutor::new(
            registry.clone(),
            bus.clone(),
            cfg.clone(),
            token_broadcast_throttle,
            streaming_update_interval_ms,
        ));
        let summary_generator =
            Arc::new(SummaryGenerator::new(registry, bus.clone(), context_builder.clone(), summary_cfg));
        Self {
            store,
            bus,
            context_builder,
            turn_executor,
            summary_generator,
            running_models: RunningModels::new(),
            cfg,
            live: RwLock::new(HashMap::new()),
        }
    }

    /// Validate + construct a new discussion and persist it (spec §4.6
    /// "Create").
    pub fn create(&self, req: CreateDiscussionRequest) -> Result<Discussion> {
        let discussion = Discussion::create(req)?;
        self.store.save(&discussion)?;
        Ok(discussion)
    }

    /// Transition to `running` and launch the turn loop on its own task.
    /// The loop never runs on the caller's thread (spec §4.6 "Start").
    pub fn start(self: &Arc<Self>, id: &str) -> Result<()> {
        let mut discussion = self.get(id)?.ok_or_else(|| Error::Validation(format!("discussion {id} not found")))?;

        if discussion.status.is_active() {
            return Err(Error::Validation("discussion is already active".into()));
        }

        discussion.status = DiscussionStatus::Running;
        discussion.touch();
        self.store.save(&discussion)?;
        self.live.write().insert(id.to_string(), discussion.clone());
        self.bus.publish(discussion_summary(&discussion));

        let this = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            this.run_loop(&id).await;
        });

        Ok(())
    }

    /// Idempotent: only discussions in `running`/`summarizing` transition.
    pub fn stop(&self, id: &str) -> Result<()> {
        let mut live = self.live.write();
        let Some(discussion) = live.get_mut(id) else { return Ok(()) };
        if !discussion.status.is_active() {
            return Ok(());
        }
        discussion.status = DiscussionStatus::Stopped;
        discussion.touch();
        self.store.save(discussion)?;
        self.bus.publish(DiscussionEvent::DiscussionStopped { discussion_id: id.to_string() });
        live.remove(id);
        Ok(())
    }

    /// Force-stop if active, then remove from memory and disk. Succeeds
    /// even if the discussion only ever existed on disk.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.stop(id)?;
        self.live.write().remove(id);
        self.store.delete(id)?;
        self.bus.publish(DiscussionEvent::DiscussionDeleted { discussion_id: id.to_string() });
        self.bus.forget(id);
        Ok(())
    }

    /// Memory first, disk fallback. Completed discussions are always
    /// loaded fresh from disk and never re-cached (spec §4.6 "Get").
    pub fn get(&self, id: &str) -> Result<Option<Discussion>> {
        if let Some(d) = self.live.read().get(id) {
            return Ok(Some(d.clone()));
        }
        self.store.load(id)
    }

    /// Union of in-memory active and index-resident entries; memory wins
    /// on id collisions; sorted by `created_at` descending.
    pub fn list(&self) -> Vec<IndexEntry> {
        let mut by_id: HashMap<String, IndexEntry> = HashMap::new();
        for entry in self.store.list() {
            by_id.insert(entry.id.clone(), entry);
        }
        for discussion in self.live.read().values() {
            by_id.insert(discussion.id.clone(), discussion.to_index_entry());
        }
        let mut entries: Vec<IndexEntry> = by_id.into_values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    /// Discussions currently in memory (spec's "active set"), used by the
    /// autosave timer task.
    pub fn active_discussions(&self) -> Vec<Discussion> {
        self.live.read().values().cloned().collect()
    }

    async fn run_loop(self: Arc<Self>, id: &str) {
        loop {
            let snapshot = { self.live.read().get(id).cloned() };
            let Some(mut discussion) = snapshot else { break };
            if discussion.status != DiscussionStatus::Running || discussion.current_round >= discussion.max_rounds {
                break;
            }

            let model = discussion.models[discussion.current_model_index].clone();

            self.running_models.acquire(&model, self.cfg.single_model_mode, self.cfg.single_model_wait_secs).await;

            let round = discussion.current_round + 1;
            let phase = Phase::for_round(discussion.current_round, discussion.max_rounds);
            let context_messages = self.context_builder.build(&discussion, &model);

            let placeholder = Message::placeholder(&model, round);
            let message_id = placeholder.id.clone();
            discussion.messages.push(placeholder);
            discussion.touch();
            let _ = self.store.save(&discussion);
            self.bus.publish(DiscussionEvent::MessageStarted {
                discussion_id: discussion.id.clone(),
                message_id: message_id.clone(),
                model: model.clone(),
                round,
            });

            let outcome = tokio::time::timeout(
                Duration::from_secs(self.cfg.turn_timeout_secs),
                self.turn_executor.execute(
                    &discussion.id,
                    &message_id,
                    &model,
                    round,
                    &discussion.topic,
                    phase,
                    &context_messages,
                ),
            )
            .await
            .unwrap_or_else(|_| crate::turn_executor::TurnOutcome {
                content: format!("[Error: {model} failed to respond within the turn deadline]"),
                success: false,
            });

            self.running_models.release(&model);

            let token_count = if outcome.success {
                let token_cfg = self.context_builder.token_estimation_config();
                discuss_context::tokens::estimate(&outcome.content, &token_cfg)
            } else {
                0
            };

            // A `stop()` may have landed while the provider call was in
            // flight: it sets status=Stopped and removes the `live` entry
            // before this point. Re-check under the write lock and discard
            // the turn result rather than resurrecting a stopped discussion
            // as Running (spec §5 "the current chunk is drained, then the
            // loop exits").
            let mut round_completed = None;
            {
                let mut live = self.live.write();
                match live.get(id) {
                    Some(current) if current.status == DiscussionStatus::Running => {}
                    _ => break,
                }

                if let Some(msg) = discussion.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.content = outcome.content.clone();
                    msg.token_count = Some(token_count);
                }
                discussion.current_model_index = (discussion.current_model_index + 1) % discussion.models.len();
                if discussion.current_model_index == 0 {
                    discussion.current_round += 1;
                    round_completed = Some(discussion.current_round);
                }
                discussion.touch();
                live.insert(id.to_string(), discussion.clone());
            }
            let _ = self.store.save(&discussion);

            self.bus.publish(DiscussionEvent::MessageComplete {
                discussion_id: discussion.id.clone(),
                message: discussion.messages.iter().find(|m| m.id == message_id).cloned().unwrap(),
                token_count,
            });
            if let Some(round) = round_completed {
                self.bus.publish(DiscussionEvent::RoundCompleted {
                    discussion_id: discussion.id.clone(),
                    round,
                    total_rounds: discussion.max_rounds,
                });
            }

            tokio::time::sleep(Duration::from_millis(self.cfg.model_delay_ms)).await;
        }

        self.finish(id).await;
    }

    /// Runs on loop exit: summary generation if the discussion is still
    /// `running`, otherwise just persists whatever terminal status it's
    /// already in.
    async fn finish(self: Arc<Self>, id: &str) {
        let snapshot = { self.live.read().get(id).cloned() };
        let Some(mut discussion) = snapshot else { return };

        if discussion.status != DiscussionStatus::Running {
            let _ = self.store.save(&discussion);
            self.live.write().remove(id);
            return;
        }

        discussion.status = DiscussionStatus::Summarizing;
        discussion.touch();
        let _ = self.store.save(&discussion);
        self.live.write().insert(id.to_string(), discussion.clone());

        let warning = self.summary_generator.generate(&mut discussion).await;

        // A concurrent `stop()` may have landed while the summary ladder was
        // running; it removes the `live` entry as soon as it persists
        // `stopped`. If that happened, that call already owns this
        // discussion's terminal state — discard this generation's result
        // instead of clobbering `stopped` with `completed`.
        if self.live.read().get(id).is_none() {
            return;
        }

        let _ = self.store.save(&discussion);

        self.bus.publish(DiscussionEvent::DiscussionCompleted {
            discussion_id: discussion.id.clone(),
            summary: discussion.summary.clone().expect("summary generator always sets a summary"),
            warning,
        });

        self.live.write().remove(id);
    }
}
