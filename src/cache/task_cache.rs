use super::entry::{CacheEntry, DeferredCandidate, MutationId};
use super::snapshot::{CacheSnapshot, EntrySnapshot};
use super::tombstones::Tombstones;
use super::Pagination;
use crate::events::CacheChange;
use crate::logging::log_cache_operation;
use crate::models::{Task, TaskId};
use crate::reconciliation::{ReconciliationPolicy, Verdict, WriteSource};
use std::collections::HashMap;
use tracing::debug;

/// Why a candidate write was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Older than the cached value
    Stale,
    /// The id was deleted; deleted tasks are never resurrected
    Deleted,
}

/// Result of routing a candidate through [`TaskCache::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Held in the entry's deferred slot; `replaced` is true when an older
    /// deferred candidate was discarded to make room
    Deferred { replaced: bool },
    Rejected(RejectReason),
}

impl UpsertOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Inserted | Self::Updated => Verdict::Accept,
            Self::Deferred { .. } => Verdict::Defer,
            Self::Rejected(_) => Verdict::Reject,
        }
    }

    /// Notification for an accepted write, if any
    pub fn change_for(&self, id: &TaskId) -> Option<CacheChange> {
        match self {
            Self::Inserted => Some(CacheChange::Inserted(id.clone())),
            Self::Updated => Some(CacheChange::Updated(id.clone())),
            Self::Deferred { .. } | Self::Rejected(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Deferred { replaced: false } => "deferred",
            Self::Deferred { replaced: true } => "deferred_replaced",
            Self::Rejected(RejectReason::Stale) => "rejected_stale",
            Self::Rejected(RejectReason::Deleted) => "rejected_deleted",
        }
    }
}

/// Counters kept for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub inserted: u64,
    pub updated: u64,
    pub deferred: u64,
    pub deferred_replaced: u64,
    pub rejected_stale: u64,
    pub rejected_deleted: u64,
    pub removed: u64,
}

/// Canonical keyed store of task entries plus the pagination aggregate.
///
/// Entries are keyed by id, so two entries can never share one. Every
/// candidate write goes through [`ReconciliationPolicy::decide`]; removal is
/// unconditional.
///
/// While a creation is in flight its server id is unknown, so a fetched or
/// realtime insert for an unknown id may be that creation's echo. Such
/// inserts are held back until no creation is pending, then re-run.
#[derive(Debug, Clone)]
pub struct TaskCache {
    entries: HashMap<TaskId, CacheEntry>,
    held: HashMap<TaskId, DeferredCandidate>,
    pagination: Pagination,
    tombstones: Tombstones,
    stale: bool,
    stats: CacheStats,
}

impl TaskCache {
    pub fn new(tombstone_capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            held: HashMap::new(),
            pagination: Pagination::default(),
            tombstones: Tombstones::new(tombstone_capacity),
            stale: false,
            stats: CacheStats::default(),
        }
    }

    /// Visible task for `id`; optimistically deleted entries are hidden
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.entries
            .get(id)
            .filter(|entry| !entry.is_hidden())
            .map(CacheEntry::task)
    }

    /// Raw entry including hidden ones
    pub fn entry(&self, id: &TaskId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Number of visible entries
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| !entry.is_hidden()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_deleted(&self, id: &TaskId) -> bool {
        self.tombstones.contains(id)
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn pending_mutation(&self, id: &TaskId) -> Option<MutationId> {
        self.entries.get(id).and_then(CacheEntry::pending_mutation_id)
    }

    /// True while any optimistic creation awaits its server id
    pub fn creation_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|(id, entry)| id.is_temporary() && entry.pending_mutation_id().is_some())
    }

    /// Insert held back behind a pending creation, if any
    pub fn held_insert(&self, id: &TaskId) -> Option<&DeferredCandidate> {
        self.held.get(id)
    }

    /// Route `candidate` through the reconciliation policy and act on the
    /// verdict. An unknown id is an insert.
    pub fn upsert(&mut self, candidate: Task, source: WriteSource) -> UpsertOutcome {
        let id = candidate.id.clone();

        let outcome = if self.tombstones.contains(&id) {
            UpsertOutcome::Rejected(RejectReason::Deleted)
        } else if source != WriteSource::Mutation
            && !self.entries.contains_key(&id)
            && self.creation_pending()
        {
            self.hold(candidate, source)
        } else {
            match ReconciliationPolicy::decide(self.entries.get(&id), &candidate, source) {
                Verdict::Accept => {
                    if let Some(entry) = self.entries.get_mut(&id) {
                        entry.replace_task(candidate);
                        UpsertOutcome::Updated
                    } else {
                        self.entries.insert(id.clone(), CacheEntry::new(candidate));
                        self.pagination.apply_delta(1);
                        UpsertOutcome::Inserted
                    }
                }
                Verdict::Defer => match self.entries.get_mut(&id) {
                    Some(entry) => UpsertOutcome::Deferred {
                        replaced: entry.defer(DeferredCandidate {
                            task: candidate,
                            source,
                        }),
                    },
                    None => UpsertOutcome::Rejected(RejectReason::Stale),
                },
                Verdict::Reject => UpsertOutcome::Rejected(RejectReason::Stale),
            }
        };

        self.count(outcome);
        let source_label = source.to_string();
        log_cache_operation(
            "upsert",
            Some(id.as_str()),
            Some(&source_label),
            outcome.label(),
            None,
        );
        outcome
    }

    /// Remove `id` unconditionally, dropping any pending token and deferred
    /// candidate. The id is remembered so later writes cannot resurrect it.
    ///
    /// Returns the task if it was visible to readers.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        self.tombstones.insert(id.clone());
        self.held.remove(id);
        let entry = self.entries.remove(id)?;
        self.stats.removed += 1;
        debug!(task_id = %id, hidden = entry.is_hidden(), "Removed cache entry");

        if entry.is_hidden() {
            return None;
        }
        self.pagination.apply_delta(-1);
        Some(entry.task().clone())
    }

    /// Immutable copy of the visible entries for readers
    pub fn snapshot(&self) -> CacheSnapshot {
        let tasks = self
            .entries
            .values()
            .filter(|entry| !entry.is_hidden())
            .map(|entry| entry.task().clone())
            .collect();
        CacheSnapshot::new(tasks, self.pagination, self.stale)
    }

    /// Capture the state of `id` before a local mutation touches it
    pub fn capture(&self, id: &TaskId) -> EntrySnapshot {
        EntrySnapshot {
            task_id: id.clone(),
            before: self.entries.get(id).cloned(),
            count_delta: 0,
        }
    }

    /// Put `id` back exactly as captured and undo the mutation's structural
    /// delta. A deleted id stays deleted.
    ///
    /// Returns the deferred candidate held while the mutation was in flight,
    /// for the caller to re-run once the entry is idle.
    pub fn restore(&mut self, snapshot: EntrySnapshot) -> Option<DeferredCandidate> {
        let id = snapshot.task_id;
        if self.tombstones.contains(&id) {
            self.entries.remove(&id);
            debug!(task_id = %id, "Skipped restore of deleted entry");
            return None;
        }

        let deferred = self
            .entries
            .get_mut(&id)
            .and_then(CacheEntry::take_deferred);
        self.pagination.apply_delta(-snapshot.count_delta);

        match snapshot.before {
            Some(mut entry) => {
                entry.clear_pending();
                entry.set_hidden(false);
                entry.take_deferred();
                self.entries.insert(id.clone(), entry);
            }
            None => {
                self.entries.remove(&id);
            }
        }

        log_cache_operation("restore", Some(id.as_str()), None, "restored", None);
        deferred
    }

    pub(crate) fn set_pending(&mut self, id: &TaskId, mutation_id: MutationId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                debug_assert!(entry.pending_mutation_id().is_none());
                entry.set_pending(mutation_id);
                true
            }
            None => false,
        }
    }

    /// Clear the pending token if it still belongs to `mutation_id`, handing
    /// back any deferred candidate
    pub(crate) fn clear_pending(
        &mut self,
        id: &TaskId,
        mutation_id: MutationId,
    ) -> Option<DeferredCandidate> {
        let entry = self.entries.get_mut(id)?;
        if entry.pending_mutation_id() != Some(mutation_id) {
            return None;
        }
        entry.clear_pending();
        entry.take_deferred()
    }

    /// Optimistically delete `id`: invisible to readers, one count unit gone
    pub(crate) fn hide(&mut self, id: &TaskId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.is_hidden() => {
                entry.set_hidden(true);
                self.pagination.apply_delta(-1);
                true
            }
            _ => false,
        }
    }

    /// Swap a temporary entry for the server-confirmed one in a single write.
    /// If a realtime echo already inserted the confirmed id, the commit merges
    /// into it instead of adding a second entry.
    pub(crate) fn replace_temporary(&mut self, temporary: &TaskId, confirmed: Task) -> UpsertOutcome {
        self.discard_temporary(temporary);
        self.upsert(confirmed, WriteSource::Mutation)
    }

    /// Drop a temporary entry without remembering its id
    pub(crate) fn discard_temporary(&mut self, temporary: &TaskId) -> bool {
        match self.entries.remove(temporary) {
            Some(entry) => {
                if !entry.is_hidden() {
                    self.pagination.apply_delta(-1);
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = pagination;
    }

    /// Adopt a server-reported page aggregate. The server still counts rows
    /// that are optimistically deleted or held back here, and cannot count
    /// creations it has not confirmed, so those are corrected for. Rollback
    /// can then undo its own delta without double counting.
    pub(crate) fn set_fetched_pagination(&mut self, fetched: Pagination) -> Pagination {
        let mut local_only = 0i64;
        for (id, entry) in &self.entries {
            if entry.is_hidden() {
                local_only -= 1;
            } else if id.is_temporary() {
                local_only += 1;
            }
        }
        local_only -= self.held.len() as i64;

        let mut pagination = fetched;
        pagination.apply_delta(local_only);
        self.pagination = pagination;
        pagination
    }

    /// Re-run held inserts once no creation is pending. Returns the outcome
    /// for each id.
    pub(crate) fn release_held(&mut self) -> Vec<(TaskId, UpsertOutcome)> {
        if self.held.is_empty() || self.creation_pending() {
            return Vec::new();
        }
        let held: Vec<DeferredCandidate> = self.held.drain().map(|(_, candidate)| candidate).collect();
        held.into_iter()
            .map(|candidate| {
                let id = candidate.task.id.clone();
                let outcome = self.upsert(candidate.task, candidate.source);
                (id, outcome)
            })
            .collect()
    }

    fn hold(&mut self, candidate: Task, source: WriteSource) -> UpsertOutcome {
        if let Some(held) = self.held.get(&candidate.id) {
            if candidate.updated_at < held.task.updated_at {
                return UpsertOutcome::Rejected(RejectReason::Stale);
            }
        }
        let replaced = self
            .held
            .insert(candidate.id.clone(), DeferredCandidate { task: candidate, source })
            .is_some();
        UpsertOutcome::Deferred { replaced }
    }

    /// Returns whether the flag changed
    pub(crate) fn set_stale(&mut self, stale: bool) -> bool {
        let changed = self.stale != stale;
        self.stale = stale;
        changed
    }

    fn count(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.stats.inserted += 1,
            UpsertOutcome::Updated => self.stats.updated += 1,
            UpsertOutcome::Deferred { replaced } => {
                self.stats.deferred += 1;
                if replaced {
                    self.stats.deferred_replaced += 1;
                }
            }
            UpsertOutcome::Rejected(RejectReason::Stale) => self.stats.rejected_stale += 1,
            UpsertOutcome::Rejected(RejectReason::Deleted) => self.stats.rejected_deleted += 1,
        }
    }
}

impl Default for TaskCache {
    fn default() -> Self {
        Self::new(crate::constants::defaults::TOMBSTONE_CAPACITY)
    }
}
