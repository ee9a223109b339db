//! Process-lifetime memoization of loaded datasets.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Keyed cache with no eviction.
///
/// Reference data is treated as immutable for the life of the process, so a
/// loaded value is never invalidated. Failed loads are not stored and will be
/// attempted again on the next request. Each key has its own cell: concurrent
/// requests for the same key never fetch twice, and a slow load only blocks
/// callers of that key.
pub struct MemoCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> MemoCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_try_load<E, F, Fut>(&self, key: K, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        // map lock only covers finding the cell
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        if let Some(value) = cell.get() {
            debug!("Cache hit for {:?}", key);
            return Ok(Arc::clone(value));
        }

        let value = cell
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(value))
    }

    /// Number of successfully loaded keys
    pub async fn entry_count(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
