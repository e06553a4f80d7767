//! Consumer identity.
//!
//! A consumer is whatever ends up showing an image: a widget, a list cell, a
//! banner slot. The loader never owns consumers; it only tracks which image
//! each one currently wants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

#[derive(Debug)]
struct ConsumerInner {
    id: ConsumerId,
    tag: Option<String>,
}

/// Shared handle to a binding target.
///
/// Clones share identity. The consumer owns the handle; the loader keeps only
/// [`WeakConsumer`] references, so dropping every clone makes the target
/// unreachable for pending deliveries.
#[derive(Debug, Clone)]
pub struct ConsumerHandle {
    inner: Arc<ConsumerInner>,
}

impl ConsumerHandle {
    /// Creates a handle with a fresh identity and no tag.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a handle carrying a tag string.
    #[must_use]
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self::build(Some(tag.into()))
    }

    fn build(tag: Option<String>) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                id: ConsumerId::next(),
                tag,
            }),
        }
    }

    /// Returns the identity of this handle.
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.inner.id
    }

    /// Returns the tag attached to this handle, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.inner.tag.as_deref()
    }

    /// Returns true if `tag` is attached to this handle.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Creates a non-owning reference to this handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakConsumer {
        WeakConsumer {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for ConsumerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ConsumerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ConsumerHandle {}

impl std::hash::Hash for ConsumerHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

/// Non-owning reference to a [`ConsumerHandle`].
#[derive(Debug, Clone)]
pub struct WeakConsumer {
    id: ConsumerId,
    inner: Weak<ConsumerInner>,
}

impl WeakConsumer {
    /// Returns the identity of the referenced handle.
    #[must_use]
    pub const fn id(&self) -> ConsumerId {
        self.id
    }

    /// Returns the handle if any owner still holds it.
    #[must_use]
    pub fn upgrade(&self) -> Option<ConsumerHandle> {
        self.inner.upgrade().map(|inner| ConsumerHandle { inner })
    }

    /// Returns true if every owning handle has been dropped.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}
