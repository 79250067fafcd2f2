//! Shared latest-reading cache.
//!
//! One writer per instrument (its poller), any number of readers (query
//! handlers taking whole-map snapshots). Values are cloned in and out under
//! a short critical section; nothing does I/O while holding the lock.

use dataweb_common::CacheEntry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle to the cache. Cloning the handle shares the same underlying map.
#[derive(Clone, Default)]
pub struct ReadingCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ReadingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest entry for one instrument, if it has ever completed a poll.
    pub async fn get(&self, name: &str) -> Option<CacheEntry> {
        self.inner.read().await.get(name).cloned()
    }

    /// Atomic snapshot of every instrument's latest entry.
    pub async fn get_all(&self) -> HashMap<String, CacheEntry> {
        self.inner.read().await.clone()
    }

    /// Overwrite the entry for one instrument.
    pub async fn set(&self, name: &str, entry: CacheEntry) {
        self.inner.write().await.insert(name.to_string(), entry);
    }
}
