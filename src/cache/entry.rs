use crate::models::Task;
use crate::reconciliation::WriteSource;
use chrono::{DateTime, Utc};
use std::fmt;

/// Generation counter identifying one in-flight local write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl MutationId {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// A write withheld because a local mutation was in flight for the same id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredCandidate {
    pub task: Task,
    pub source: WriteSource,
}

/// A cached task plus its synchronization bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    task: Task,
    updated_at: DateTime<Utc>,
    pending_mutation_id: Option<MutationId>,
    deferred: Option<DeferredCandidate>,
    hidden: bool,
}

impl CacheEntry {
    pub fn new(task: Task) -> Self {
        Self {
            updated_at: task.updated_at,
            task,
            pending_mutation_id: None,
            deferred: None,
            hidden: false,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn pending_mutation_id(&self) -> Option<MutationId> {
        self.pending_mutation_id
    }

    pub fn deferred(&self) -> Option<&DeferredCandidate> {
        self.deferred.as_ref()
    }

    /// Hidden entries are optimistically deleted: invisible to readers but
    /// still holding their pending token and deferred slot
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn replace_task(&mut self, task: Task) {
        self.updated_at = task.updated_at;
        self.task = task;
    }

    pub(crate) fn set_pending(&mut self, mutation_id: MutationId) {
        self.pending_mutation_id = Some(mutation_id);
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending_mutation_id = None;
    }

    /// Store `candidate` in the single deferred slot; returns whether an older
    /// candidate was discarded
    pub(crate) fn defer(&mut self, candidate: DeferredCandidate) -> bool {
        self.deferred.replace(candidate).is_some()
    }

    pub(crate) fn take_deferred(&mut self) -> Option<DeferredCandidate> {
        self.deferred.take()
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
}
