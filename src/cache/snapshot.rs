use super::{CacheEntry, Pagination};
use crate::models::{Task, TaskId};
use std::sync::Arc;

/// Immutable copy of the visible cache contents handed to readers.
///
/// Tasks are ordered by id, so two caches holding the same entries produce
/// equal snapshots regardless of write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    tasks: Arc<[Task]>,
    pagination: Pagination,
    stale: bool,
}

impl CacheSnapshot {
    pub(crate) fn new(mut tasks: Vec<Task>, pagination: Pagination, stale: bool) -> Self {
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            tasks: tasks.into(),
            pagination,
            stale,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks
            .binary_search_by(|task| task.id.cmp(id))
            .ok()
            .map(|index| &self.tasks[index])
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks.to_vec()
    }
}

/// Pre-mutation state of a single id, captured by `begin` and consumed by
/// rollback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub(crate) task_id: TaskId,
    pub(crate) before: Option<CacheEntry>,
    /// Structural change the optimistic write applied to `total_count`
    pub(crate) count_delta: i64,
}

impl EntrySnapshot {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn before(&self) -> Option<&Task> {
        self.before.as_ref().map(CacheEntry::task)
    }

    pub fn count_delta(&self) -> i64 {
        self.count_delta
    }
}
