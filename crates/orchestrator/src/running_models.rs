//! Single-model-mode mutual exclusion (spec §4.6 step 2): at most one
//! model may be mid-turn across all discussions when single-model mode is
//! on. A turn that waits past the timeout force-clears the set, treating
//! it as recovery from a stuck prior turn rather than a permanent jam.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct RunningModels {
    inner: Mutex<HashSet<String>>,
}

impl RunningModels {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashSet::new()) }
    }

    /// Block until `model` can be inserted into the running set. When
    /// single-model mode is off, insertion is unconditional.
    pub async fn acquire(&self, model: &str, single_model_mode: bool, wait_secs: u64) {
        if !single_model_mode {
            self.inner.lock().insert(model.to_string());
            return;
        }

        let deadline = Instant::now() + Duration::from_secs(wait_secs);
        loop {
            {
                let mut set = self.inner.lock();
                if set.is_empty() {
                    set.insert(model.to_string());
                    return;
                }
            }
            if Instant::now() >= deadline {
                tracing::warn!(model, "force-clearing stuck running-models set after timeout");
                let mut set = self.inner.lock();
                set.clear();
                set.insert(model.to_string());
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn release(&self, model: &str) {
        self.inner.lock().remove(model);
    }

    pub fn release_all(&self, models: &[String]) {
        let mut set = self.inner.lock();
        for m in models {
            set.remove(m);
        }
    }
}

impl Default for RunningModels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_without_single_model_mode_never_blocks() {
        let rm = RunningModels::new();
        rm.acquire("a", false, 1).await;
        rm.acquire("b", false, 1).await;
        assert_eq!(rm.inner.lock().len(), 2);
    }

    #[tokio::test]
    async fn acquire_waits_for_release_under_single_model_mode() {
        let rm = RunningModels::new();
        rm.acquire("a", true, 30).await;

        let rm_ref = &rm;
        let acquire_b = async {
            rm_ref.acquire("b", true, 30).await;
        };
        let release_a = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            rm_ref.release("a");
        };
        tokio::join!(acquire_b, release_a);
        assert!(rm.inner.lock().contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn force_clears_after_timeout() {
        let rm = RunningModels::new();
        rm.acquire("a", true, 1).await;
        rm.acquire("b", true, 1).await;
        assert!(rm.inner.lock().contains("b"));
        assert!(!rm.inner.lock().contains("a"));
    }
}
