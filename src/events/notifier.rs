//! # Change Notifier
//!
//! Plain observer list for accepted cache writes.
//!
//! ## Overview
//!
//! Listeners are registered with [`ChangeNotifier::subscribe`], receive every
//! [`CacheChange`], and are removed with [`ChangeNotifier::unsubscribe`].
//! Changes from one cache write arrive in the order that write applied them.
//! Writes racing on different threads are delivered without a global order,
//! so listeners that need the current state should read a fresh snapshot. The notifier knows nothing about how
//! consumers render, so views and presentation layers can be swapped freely.
//!
//! Listeners run synchronously on the writer's thread, after the cache lock
//! has been released. They may read the cache but should not block.

use crate::constants::changes;
use crate::models::TaskId;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An accepted change to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheChange {
    Inserted(TaskId),
    Updated(TaskId),
    Removed(TaskId),
    /// Rolled back to its pre-mutation state
    Restored(TaskId),
    /// Temporary creation entry swapped for the server-assigned id
    Replaced { temporary: TaskId, confirmed: TaskId },
    PageLoaded { page: u32, total_count: u64 },
    StaleChanged(bool),
}

impl CacheChange {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inserted(_) => changes::TASK_INSERTED,
            Self::Updated(_) => changes::TASK_UPDATED,
            Self::Removed(_) => changes::TASK_REMOVED,
            Self::Restored(_) => changes::TASK_RESTORED,
            Self::Replaced { .. } => changes::TASK_REPLACED,
            Self::PageLoaded { .. } => changes::PAGE_LOADED,
            Self::StaleChanged(_) => changes::STALE_CHANGED,
        }
    }

    /// The task id this change concerns, if it concerns a single task
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Self::Inserted(id) | Self::Updated(id) | Self::Removed(id) | Self::Restored(id) => {
                Some(id)
            }
            Self::Replaced { confirmed, .. } => Some(confirmed),
            Self::PageLoaded { .. } | Self::StaleChanged(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type ChangeListener = Arc<dyn Fn(&CacheChange) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ChangeNotifier {
    listeners: Arc<RwLock<Vec<(ListenerId, ChangeListener)>>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&CacheChange) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns false when `id` was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn notify(&self, change: &CacheChange) {
        // Clone out so listeners may subscribe or unsubscribe while being called
        let listeners: Vec<ChangeListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(change);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
