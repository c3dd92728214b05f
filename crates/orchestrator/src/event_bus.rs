//! Event Bus (C2) — process-wide publish/subscribe with a bounded history
//! ring, grounded on `sa_gateway::runtime::runs::RunStore`'s broadcast
//! channel + `VecDeque`-backed ring pattern.
//!
//! Unlike the teacher's per-run channels (one run, one subscriber
//! lifecycle), a discussion can be watched by several clients across its
//! whole lifetime, so each discussion id gets one broadcast sender that
//! outlives any single subscriber; delivery is best-effort per spec §4.2
//! ("if a subscriber's outbound queue is full, the event is dropped").

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use discuss_domain::event::{DiscussionEvent, EventEnvelope};

const CHANNEL_CAPACITY: usize = 256;
const MAX_HISTORY_PER_DISCUSSION: usize = 500;

pub struct EventBus {
    channels: RwLock<HashMap<String, broadcast::Sender<EventEnvelope>>>,
    history: RwLock<HashMap<String, VecDeque<EventEnvelope>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { channels: RwLock::new(HashMap::new()), history: RwLock::new(HashMap::new()) }
    }

    /// Subscribe to a discussion's events, creating its channel on first use.
    pub fn subscribe(&self, discussion_id: &str) -> broadcast::Receiver<EventEnvelope> {
        let mut channels = self.channels.write();
        let tx = channels
            .entry(discussion_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        tx.subscribe()
    }

    /// Publish an event: record it in the bounded ring, then broadcast
    /// fire-and-forget. A `send` error just means there are no current
    /// subscribers — never treated as a failure.
    pub fn publish(&self, event: DiscussionEvent) {
        let envelope = EventEnvelope::new(event);
        let discussion_id = envelope.event.discussion_id().to_string();

        {
            let mut history = self.history.write();
            let ring = history.entry(discussion_id.clone()).or_default();
            ring.push_back(envelope.clone());
            while ring.len() > MAX_HISTORY_PER_DISCUSSION {
                ring.pop_front();
            }
        }

        let tx = {
            let mut channels = self.channels.write();
            channels.entry(discussion_id).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).clone()
        };
        let _ = tx.send(envelope);
    }

    /// Recent events for a discussion, oldest first.
    pub fn recent(&self, discussion_id: &str) -> Vec<EventEnvelope> {
        self.history.read().get(discussion_id).map(|r| r.iter().cloned().collect()).unwrap_or_default()
    }

    /// Drop a discussion's channel and history (spec: `discussion_deleted`).
    pub fn forget(&self, discussion_id: &str) {
        self.channels.write().remove(discussion_id);
        self.history.write().remove(discussion_id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits a throttled stream of `message_token` events: every `k` tokens or
/// every `interval`, whichever comes first, plus an unconditional final
/// emission (spec §4.2 "A final `done=true` token event is always
/// emitted, bypassing throttle").
pub struct TokenThrottle {
    k: u32,
    interval: std::time::Duration,
    count_since_emit: u32,
    last_emit: std::time::Instant,
}

impl TokenThrottle {
    pub fn new(k: u32, interval_ms: u64) -> Self {
        Self {
            k: k.max(1),
            interval: std::time::Duration::from_millis(interval_ms),
            count_since_emit: 0,
            last_emit: std::time::Instant::now(),
        }
    }

    /// Call once per received token/chunk. Returns true when this chunk
    /// should trigger an emission.
    pub fn tick(&mut self) -> bool {
        self.count_since_emit += 1;
        let due = self.count_since_emit >= self.k || self.last_emit.elapsed() >= self.interval;
        if due {
            self.count_since_emit = 0;
            self.last_emit = std::time::Instant::now();
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(DiscussionEvent::DiscussionStopped { discussion_id: "d1".into() });
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("d1");
        bus.publish(DiscussionEvent::DiscussionStopped { discussion_id: "d1".into() });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.discussion_id(), "d1");
    }

    #[test]
    fn history_ring_is_bounded_and_ordered() {
        let bus = EventBus::new();
        for i in 0..(MAX_HISTORY_PER_DISCUSSION + 10) {
            bus.publish(DiscussionEvent::DiscussionError { discussion_id: "d1".into(), error: i.to_string() });
        }
        let recent = bus.recent("d1");
        assert_eq!(recent.len(), MAX_HISTORY_PER_DISCUSSION);
    }

    #[test]
    fn forget_clears_channel_and_history() {
        let bus = EventBus::new();
        bus.publish(DiscussionEvent::DiscussionStopped { discussion_id: "d1".into() });
        bus.forget("d1");
        assert!(bus.recent("d1").is_empty());
    }

    #[test]
    fn token_throttle_fires_every_k_tokens() {
        let mut throttle = TokenThrottle::new(3, 100_000);
        assert!(!throttle.tick());
        assert!(!throttle.tick());
        assert!(throttle.tick());
    }

    #[test]
    fn token_throttle_resets_after_firing() {
        let mut throttle = TokenThrottle::new(2, 100_000);
        assert!(!throttle.tick());
        assert!(throttle.tick());
        assert!(!throttle.tick());
    }
}
