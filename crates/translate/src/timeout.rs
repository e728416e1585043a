//! Per-segment translation timers. Each registered segment gets a timer
//! (default 7000 ms, extendable to 10000 ms for long source text) that
//! resolves to "expired" unless `complete` cancels it first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct TimeoutRegistry {
    default_timeout: Duration,
    max_timeout: Duration,
    entries: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl TimeoutRegistry {
    pub fn new(default_ms: u64, max_ms: u64) -> Self {
        Self {
            default_timeout: Duration::from_millis(default_ms),
            max_timeout: Duration::from_millis(max_ms),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a timer for `segment_id` and returns a future resolving to
    /// `true` if the timer elapsed, `false` if `complete` cancelled it
    /// first. `extend` selects the long-source-text timeout ceiling.
    pub fn watch(&self, segment_id: impl Into<String>, extend: bool) -> impl std::future::Future<Output = bool> + Send + 'static {
        let segment_id = segment_id.into();
        let notify = Arc::new(Notify::new());
        self.entries.lock().insert(segment_id.clone(), notify.clone());
        let duration = if extend { self.max_timeout } else { self.default_timeout };
        let entries = self.entries.clone();

        async move {
            let expired = tokio::select! {
                _ = tokio::time::sleep(duration) => true,
                _ = notify.notified() => false,
            };
            entries.lock().remove(&segment_id);
            expired
        }
    }

    /// Cancels the timer for `segment_id`, if still pending. Idempotent:
    /// calling this twice, or after the timer already fired, is a no-op.
    pub fn complete(&self, segment_id: &str) {
        if let Some(notify) = self.entries.lock().remove(segment_id) {
            notify.notify_one();
        }
    }

    pub fn is_pending(&self, segment_id: &str) -> bool {
        self.entries.lock().contains_key(segment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timer_expires_when_not_completed() {
        let registry = TimeoutRegistry::new(5, 20);
        let expired = registry.watch("seg-1", false).await;
        assert!(expired);
        assert!(!registry.is_pending("seg-1"));
    }

    #[tokio::test]
    async fn complete_cancels_pending_timer() {
        let registry = TimeoutRegistry::new(200, 400);
        let fut = registry.watch("seg-1", false);
        registry.complete("seg-1");
        let expired = fut.await;
        assert!(!expired);
    }

    #[tokio::test]
    async fn extend_selects_the_longer_ceiling() {
        let registry = TimeoutRegistry::new(5, 5000);
        registry.watch("seg-1", true);
        assert!(registry.is_pending("seg-1"));
        registry.complete("seg-1");
        assert!(!registry.is_pending("seg-1"));
    }
}
