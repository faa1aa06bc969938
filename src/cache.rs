//! Render-scoped state cache, partitioned by context identifier.
//!
//! One context identifier denotes one rendering context (full vs. preview
//! pass). Entries accumulate across preview renders of the same context and
//! are flushed only when a full render occurs for it. This module stores no
//! domain knowledge of attachments — it is a keyed store whose value type is
//! opaque to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Opaque render-context identifier used as the cache partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(
    /// The raw identifier as supplied by the host renderer.
    pub String,
);

/// Process-wide cache keyed by context identifier. Each context owns its own
/// lock, so concurrent renders for *different* contexts never contend, while
/// clear/read/write sequences for the *same* context serialize.
#[derive(Debug, Default)]
pub struct RenderStateCache<V> {
    contexts: Mutex<HashMap<ContextId, Shard<V>>>,
}

type Shard<V> = Arc<Mutex<HashMap<String, V>>>;

impl<V> RenderStateCache<V> {
    /// An empty cache.
    pub fn new() -> Self {
        Self { contexts: Mutex::new(HashMap::new()) }
    }

    /// Handle to one context's entries, creating the partition on first use.
    /// The outer lock is held only long enough to fetch the shard.
    pub fn cache(&self, ctx: &ContextId) -> ContextCache<V> {
        let mut contexts = self
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let shard = contexts.entry(ctx.clone()).or_default();
        ContextCache { shard: Arc::clone(shard) }
    }

    /// Discard every entry for one context. Idempotent: clearing an absent
    /// or already-empty context is a no-op.
    pub fn clear_all(&self, ctx: &ContextId) {
        let shard = {
            let contexts = self
                .contexts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            contexts.get(ctx).map(Arc::clone)
        };
        let Some(shard) = shard else { return };

        let mut entries = shard.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.is_empty() {
            debug!(context = %ctx.0, dropped = entries.len(), "state cache cleared");
        }
        entries.clear();
    }
}

/// Cheap, cloneable handle to one context's entry map.
#[derive(Debug)]
pub struct ContextCache<V> {
    shard: Shard<V>,
}

impl<V> Clone for ContextCache<V> {
    fn clone(&self) -> Self {
        Self { shard: Arc::clone(&self.shard) }
    }
}

impl<V> ContextCache<V> {
    /// Store a value under a key (typically a tag signature), returning the
    /// previous value if one was present.
    pub fn insert(&self, key: String, value: V) -> Option<V> {
        let mut entries = self.shard.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value)
    }

    /// Whether this context currently holds no entries.
    pub fn is_empty(&self) -> bool {
        let entries = self.shard.lock().unwrap_or_else(PoisonError::into_inner);
        entries.is_empty()
    }

    /// Number of entries in this context.
    pub fn len(&self) -> usize {
        let entries = self.shard.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }
}

impl<V: Clone> ContextCache<V> {
    /// The value stored under a key, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.shard.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }
}
