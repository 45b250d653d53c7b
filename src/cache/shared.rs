use super::{CacheSnapshot, TaskCache};
use crate::events::{CacheChange, ChangeNotifier};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Handle to the single cache shared by the mutation coordinator, the
/// realtime ingester and readers.
///
/// Each `write` runs to completion under the lock, so readers never observe a
/// half-applied change. Listeners are notified after the lock is released;
/// one write's changes stay in order, but two concurrent writes may notify in
/// either order.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<TaskCache>>,
    notifier: ChangeNotifier,
}

impl SharedCache {
    pub fn new(cache: TaskCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&TaskCache) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Apply one logical write. Changes pushed by `f` are delivered to
    /// listeners once the write is complete.
    pub fn write<R>(&self, f: impl FnOnce(&mut TaskCache, &mut Vec<CacheChange>) -> R) -> R {
        let mut changes = Vec::new();
        let result = {
            let mut cache = self.inner.lock();
            f(&mut cache, &mut changes)
        };
        for change in &changes {
            self.notifier.notify(change);
        }
        result
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.read(TaskCache::snapshot)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("SharedCache")
            .field("entries", &cache.len())
            .field("pagination", &cache.pagination())
            .field("stale", &cache.is_stale())
            .field("listeners", &self.notifier.listener_count())
            .finish()
    }
}
