//! Bookkeeping for pending watches: at most one cancellable timer per
//! (group, channel) key, newest departure wins.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::JoinHandle;

use vigil_core::types::{ChannelId, GroupId};

/// Identifies the channel the monitored participant departed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub group_id: GroupId,
    pub channel_id: ChannelId,
}

struct WatchEntry {
    generation: u64,
    handle: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

/// Key -> pending-watch map behind a single mutex. The registry is the
/// sole owner of each watch's cancellation handle; all map mutations are
/// atomic with respect to concurrently-firing timers.
#[derive(Default)]
pub struct WatchRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<WatchKey, WatchEntry>,
    next_generation: u64,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cancel any pending watch for `key`, then start a fresh one. The
    /// `spawn` callback receives the new watch's generation and must
    /// return the spawned task's handle. Runs entirely under the lock, so
    /// a concurrent timer for the same key cannot interleave.
    pub fn start_or_replace<F>(&self, key: WatchKey, spawn: F) -> u64
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut state = self.lock();
        if let Some(prev) = state.entries.remove(&key) {
            prev.handle.abort();
            let pending_secs = (Utc::now() - prev.started_at).num_seconds();
            tracing::debug!(
                group = key.group_id,
                channel = key.channel_id,
                pending_secs,
                "superseding pending watch"
            );
        }
        state.next_generation += 1;
        let generation = state.next_generation;
        let handle = spawn(generation);
        state.entries.insert(key, WatchEntry { generation, handle, started_at: Utc::now() });
        generation
    }

    /// Cancel and remove the watch for `key`, if any.
    pub fn cancel(&self, key: WatchKey) {
        if let Some(entry) = self.lock().entries.remove(&key) {
            entry.handle.abort();
        }
    }

    /// Called by a watch task after its grace period: remove the entry iff
    /// `generation` still owns it. Returns false when the watch was
    /// superseded while sleeping; idempotent on repeated calls.
    pub fn claim(&self, key: WatchKey, generation: u64) -> bool {
        let mut state = self.lock();
        let owned = state
            .entries
            .get(&key)
            .is_some_and(|entry| entry.generation == generation);
        if owned {
            state.entries.remove(&key);
        }
        owned
    }

    pub fn contains(&self, key: WatchKey) -> bool {
        self.lock().entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn key(channel_id: ChannelId) -> WatchKey {
        WatchKey { group_id: 10, channel_id }
    }

    #[tokio::test]
    async fn test_replace_cancels_previous_timer() {
        let registry = Arc::new(WatchRegistry::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let fired = first.clone();
        registry.start_or_replace(key(1), |_| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        let fired = second.clone();
        registry.start_or_replace(key(1), |_| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0, "superseded timer must not fire");
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_timer() {
        let registry = Arc::new(WatchRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        registry.start_or_replace(key(2), |_| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        registry.cancel(key(2));
        assert!(registry.is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_absent_key_is_noop() {
        let registry = WatchRegistry::new();
        registry.cancel(key(3));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_claim_requires_current_generation() {
        let registry = WatchRegistry::new();
        let first = registry.start_or_replace(key(4), |_| tokio::spawn(async {}));
        let second = registry.start_or_replace(key(4), |_| tokio::spawn(async {}));
        assert_ne!(first, second);

        assert!(!registry.claim(key(4), first), "stale generation must not claim");
        assert!(registry.contains(key(4)));
        assert!(registry.claim(key(4), second));
        assert!(!registry.contains(key(4)));
        // Idempotent once removed.
        assert!(!registry.claim(key(4), second));
    }

    #[tokio::test]
    async fn test_independent_keys_coexist() {
        let registry = WatchRegistry::new();
        registry.start_or_replace(key(5), |_| tokio::spawn(async {}));
        registry.start_or_replace(key(6), |_| tokio::spawn(async {}));
        assert_eq!(registry.len(), 2);
        registry.cancel(key(5));
        assert!(registry.contains(key(6)));
    }
}
