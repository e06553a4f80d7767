//! Tracks which image each consumer currently expects.
//!
//! Every request overwrites the consumer's entry, so a task for an older key
//! can detect that it has been superseded both before it starts working and
//! again right before its result is shown.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::domain::entities::{ConsumerHandle, ConsumerId, LoadTask, ResourceKey, WeakConsumer};

const MIN_SWEEP_THRESHOLD: usize = 64;

#[derive(Debug)]
struct Entry {
    key: ResourceKey,
    consumer: WeakConsumer,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<ConsumerId, Entry>,
    sweep_at: usize,
}

/// Concurrent map from live consumers to their current resource key.
///
/// Consumers are held weakly: dead entries are dropped by [`sweep`], which
/// also runs automatically whenever the map doubles past its last swept
/// size.
///
/// [`sweep`]: DispatchRegistry::sweep
#[derive(Debug)]
pub struct DispatchRegistry {
    inner: RwLock<Inner>,
}

impl DispatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            }),
        }
    }

    /// Records that `consumer` now wants `key`, replacing any earlier key.
    pub fn register(&self, consumer: &ConsumerHandle, key: ResourceKey) {
        let mut inner = self.inner.write();
        inner.entries.insert(
            consumer.id(),
            Entry {
                key,
                consumer: consumer.downgrade(),
            },
        );

        if inner.entries.len() >= inner.sweep_at {
            let before = inner.entries.len();
            inner.entries.retain(|_, entry| !entry.consumer.is_dead());
            inner.sweep_at = (inner.entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
            trace!(
                removed = before - inner.entries.len(),
                "Swept dead consumers"
            );
        }
    }

    /// Returns the key `id` currently expects.
    #[must_use]
    pub fn current(&self, id: ConsumerId) -> Option<ResourceKey> {
        self.inner.read().entries.get(&id).map(|e| e.key.clone())
    }

    /// Returns true if `task` no longer matches what its consumer expects.
    ///
    /// A task is stale when the consumer has been dropped, forgotten, or
    /// re-registered with another key.
    #[must_use]
    pub fn is_reused(&self, task: &LoadTask) -> bool {
        if task.consumer.is_dead() {
            return true;
        }
        let inner = self.inner.read();
        inner
            .entries
            .get(&task.consumer.id())
            .is_none_or(|entry| entry.key != task.key)
    }

    /// Removes the entry for `consumer`. Pending tasks for it become stale.
    pub fn forget(&self, consumer: &ConsumerHandle) -> Option<ResourceKey> {
        self.inner
            .write()
            .entries
            .remove(&consumer.id())
            .map(|e| e.key)
    }

    /// Drops entries whose consumer no longer exists. Returns how many.
    pub fn sweep(&self) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.consumer.is_dead());
        before - inner.entries.len()
    }

    /// Returns the number of tracked consumers, live or not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> ResourceKey {
        ResourceKey::new(format!("https://example.com/{s}.png"))
    }

    #[test]
    fn test_register_overwrites() {
        let registry = DispatchRegistry::new();
        let consumer = ConsumerHandle::new();

        registry.register(&consumer, key("a"));
        registry.register(&consumer, key("b"));

        assert_eq!(registry.current(consumer.id()), Some(key("b")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_superseded_task_is_reused() {
        let registry = DispatchRegistry::new();
        let consumer = ConsumerHandle::new();

        registry.register(&consumer, key("a"));
        let task_a = LoadTask::new(key("a"), &consumer, None);
        assert!(!registry.is_reused(&task_a));

        registry.register(&consumer, key("b"));
        let task_b = LoadTask::new(key("b"), &consumer, None);
        assert!(registry.is_reused(&task_a));
        assert!(!registry.is_reused(&task_b));
    }

    #[test]
    fn test_forget_makes_tasks_stale() {
        let registry = DispatchRegistry::new();
        let consumer = ConsumerHandle::new();
        registry.register(&consumer, key("a"));
        let task = LoadTask::new(key("a"), &consumer, None);

        assert_eq!(registry.forget(&consumer), Some(key("a")));
        assert!(registry.is_reused(&task));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_consumer_is_stale_and_swept() {
        let registry = DispatchRegistry::new();
        let consumer = ConsumerHandle::new();
        let keeper = ConsumerHandle::new();
        registry.register(&consumer, key("a"));
        registry.register(&keeper, key("b"));
        let task = LoadTask::new(key("a"), &consumer, None);

        drop(consumer);
        assert!(registry.is_reused(&task));
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.current(keeper.id()), Some(key("b")));
    }

    #[test]
    fn test_register_sweeps_when_growing() {
        let registry = DispatchRegistry::new();
        for i in 0..MIN_SWEEP_THRESHOLD * 2 {
            let transient = ConsumerHandle::new();
            registry.register(&transient, key(&i.to_string()));
        }
        assert!(registry.len() < MIN_SWEEP_THRESHOLD);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(DispatchRegistry::new());
        let consumers: Vec<_> = (0..8).map(|_| ConsumerHandle::new()).collect();

        std::thread::scope(|s| {
            for consumer in &consumers {
                let registry = registry.clone();
                s.spawn(move || {
                    for i in 0..100 {
                        registry.register(consumer, key(&i.to_string()));
                    }
                });
            }
        });

        for consumer in &consumers {
            assert_eq!(registry.current(consumer.id()), Some(key("99")));
        }
    }
}
