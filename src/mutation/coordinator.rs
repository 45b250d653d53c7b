use super::kind::{LocalChange, MutationKind, MutationKindTag};
use super::lanes::{LaneGuard, MutationLanes};
use crate::cache::{EntrySnapshot, MutationId, RejectReason, SharedCache, TaskCache, UpsertOutcome};
use crate::error::{SyncError, SyncResult};
use crate::events::CacheChange;
use crate::logging::log_mutation_operation;
use crate::models::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use crate::reconciliation::WriteSource;
use crate::remote::{RemoteCall, RemoteStore, RetryPolicy};
use crate::validation;
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle for one in-flight mutation.
///
/// Holds the id's lane, so the next queued mutation for the same id cannot
/// begin until this one is settled. A token dropped without `commit` or
/// `abort` rolls its optimistic write back.
#[must_use = "a mutation token must be committed or aborted"]
pub struct MutationToken {
    id: MutationId,
    task_id: TaskId,
    kind: MutationKindTag,
    snapshot: Option<EntrySnapshot>,
    optimistic: Option<Task>,
    cache: SharedCache,
    _lane: LaneGuard,
}

impl MutationToken {
    pub fn mutation_id(&self) -> MutationId {
        self.id
    }

    /// Id the optimistic write landed on; temporary for creations
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn kind(&self) -> MutationKindTag {
        self.kind
    }

    /// The predicted task, `None` for deletions
    pub fn optimistic(&self) -> Option<&Task> {
        self.optimistic.as_ref()
    }

    pub fn snapshot(&self) -> Option<&EntrySnapshot> {
        self.snapshot.as_ref()
    }
}

impl Drop for MutationToken {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            warn!(
                task_id = %self.task_id,
                mutation_id = %self.id,
                kind = %self.kind,
                "Mutation token dropped unsettled, rolling back"
            );
            let kind = self.kind;
            self.cache
                .write(|cache, changes| roll_back(cache, changes, kind, snapshot, None));
        }
    }
}

impl fmt::Debug for MutationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationToken")
            .field("id", &self.id)
            .field("task_id", &self.task_id)
            .field("kind", &self.kind)
            .field("settled", &self.snapshot.is_none())
            .finish()
    }
}

/// Orchestrates optimistic writes against the shared cache and the remote
/// store.
pub struct MutationCoordinator {
    cache: SharedCache,
    remote: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    lanes: MutationLanes,
    generation: AtomicU64,
}

impl MutationCoordinator {
    pub fn new(cache: SharedCache, remote: Arc<dyn RemoteStore>, retry: RetryPolicy) -> Self {
        Self {
            cache,
            remote,
            retry,
            lanes: MutationLanes::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn lanes(&self) -> &MutationLanes {
        &self.lanes
    }

    /// Wait for `task_id` to be idle, then apply `transform` optimistically.
    ///
    /// `transform` sees the visible task (if any) as it stands once every
    /// earlier mutation on the id has settled. Nothing is written when it
    /// returns an error.
    pub async fn begin<F>(
        &self,
        task_id: TaskId,
        kind: MutationKindTag,
        transform: F,
    ) -> SyncResult<MutationToken>
    where
        F: FnOnce(Option<&Task>) -> SyncResult<LocalChange>,
    {
        let lane = self.lanes.acquire(&task_id).await;
        let mutation_id = MutationId::new(self.generation.fetch_add(1, Ordering::Relaxed) + 1);

        let (snapshot, optimistic) = self.cache.write(|cache, changes| {
            let mut snapshot = cache.capture(&task_id);
            let optimistic = match transform(cache.get(&task_id))? {
                LocalChange::Upsert(task) => {
                    if task.id != task_id {
                        return Err(SyncError::Internal(format!(
                            "optimistic task {} written under {task_id}",
                            task.id
                        )));
                    }
                    let outcome = cache.upsert(task.clone(), WriteSource::Mutation);
                    match outcome {
                        UpsertOutcome::Inserted => snapshot.count_delta = 1,
                        UpsertOutcome::Updated => {}
                        UpsertOutcome::Rejected(RejectReason::Deleted) => {
                            return Err(SyncError::conflict(task_id.clone()));
                        }
                        UpsertOutcome::Rejected(RejectReason::Stale) | UpsertOutcome::Deferred { .. } => {
                            return Err(SyncError::Internal(format!(
                                "optimistic write for {task_id} was not accepted"
                            )));
                        }
                    }
                    changes.extend(outcome.change_for(&task_id));
                    Some(task)
                }
                LocalChange::Hide => {
                    if !cache.hide(&task_id) {
                        return Err(SyncError::unknown_task(task_id.clone()));
                    }
                    snapshot.count_delta = -1;
                    changes.push(CacheChange::Removed(task_id.clone()));
                    None
                }
            };
            cache.set_pending(&task_id, mutation_id);
            Ok((snapshot, optimistic))
        })?;

        log_mutation_operation(
            "begin",
            task_id.as_str(),
            mutation_id.value(),
            kind.as_str(),
            "pending",
            None,
        );

        Ok(MutationToken {
            id: mutation_id,
            task_id,
            kind,
            snapshot: Some(snapshot),
            optimistic,
            cache: self.cache.clone(),
            _lane: lane,
        })
    }

    /// Settle on the remote store's answer. Returns the confirmed task, or
    /// for deletions the task as it was before the mutation.
    pub fn commit(&self, mut token: MutationToken, confirmed: Option<Task>) -> Option<Task> {
        let Some(snapshot) = token.snapshot.take() else {
            return confirmed;
        };
        let task_id = token.task_id.clone();
        let kind = token.kind;
        let mutation_id = token.id;
        let before = snapshot.before().cloned();

        self.cache.write(|cache, changes| {
            if kind.is_create() {
                match confirmed.clone() {
                    Some(task) => {
                        let confirmed_id = task.id.clone();
                        if cache.replace_temporary(&task_id, task).is_accepted() {
                            changes.push(CacheChange::Replaced {
                                temporary: task_id.clone(),
                                confirmed: confirmed_id,
                            });
                        } else {
                            // Deleted elsewhere before the confirmation arrived
                            changes.push(CacheChange::Removed(task_id.clone()));
                        }
                    }
                    None => {
                        if cache.discard_temporary(&task_id) {
                            changes.push(CacheChange::Removed(task_id.clone()));
                        }
                    }
                }
                release_held(cache, changes);
                return;
            }

            if kind == MutationKindTag::Delete {
                // Already hidden and counted at begin
                cache.remove(&task_id);
                return;
            }

            let deferred = cache.clear_pending(&task_id, mutation_id);
            if let Some(task) = confirmed.clone() {
                let outcome = cache.upsert(task, WriteSource::Mutation);
                changes.extend(outcome.change_for(&task_id));
            }
            if let Some(deferred) = deferred {
                let outcome = cache.upsert(deferred.task, deferred.source);
                debug!(
                    task_id = %task_id,
                    source = %deferred.source,
                    verdict = %outcome.verdict(),
                    "Re-ran deferred candidate after commit"
                );
                changes.extend(outcome.change_for(&task_id));
            }
        });

        log_mutation_operation(
            "commit",
            task_id.as_str(),
            mutation_id.value(),
            kind.as_str(),
            "committed",
            confirmed.as_ref().map(|task| task.id.as_str()),
        );
        drop(token);

        confirmed.or(before)
    }

    /// Roll back the optimistic write, then hand `error` back for the caller
    /// to surface. A conflict removes the id instead of restoring it.
    pub fn abort(&self, mut token: MutationToken, error: SyncError) -> SyncError {
        let Some(snapshot) = token.snapshot.take() else {
            return error;
        };
        let conflicted = match &error {
            SyncError::Conflict { task_id } => Some(task_id.clone()),
            _ => None,
        };
        let kind = token.kind;

        self.cache
            .write(|cache, changes| roll_back(cache, changes, kind, snapshot, conflicted));

        let details = error.to_string();
        log_mutation_operation(
            "abort",
            token.task_id.as_str(),
            token.id.value(),
            kind.as_str(),
            error.kind(),
            Some(&details),
        );
        drop(token);

        error
    }

    /// Validate, apply optimistically, call the remote store and settle.
    ///
    /// `task_id` is the target for every kind except `Create`; for
    /// `CreateFollowUp` it names the parent.
    pub async fn execute(&self, task_id: Option<TaskId>, kind: MutationKind) -> SyncResult<Task> {
        validation::validate_mutation(task_id.as_ref(), &kind)?;
        let tag = kind.tag();

        let (token, call) = match kind {
            MutationKind::Create(fields) => self.begin_create(tag, fields).await?,
            MutationKind::CreateFollowUp(mut fields) => {
                let parent = required(task_id)?;
                if !self.cache.read(|cache| cache.contains(&parent)) {
                    return Err(SyncError::unknown_task(parent));
                }
                fields.parent_task_id = Some(parent);
                self.begin_create(tag, fields).await?
            }
            MutationKind::Update(patch) => {
                let id = required(task_id)?;
                let token = self
                    .begin(id.clone(), tag, |current| {
                        let mut task = existing(current, &id)?;
                        task.apply_patch(&patch);
                        Ok(LocalChange::Upsert(task))
                    })
                    .await?;
                (token, RemoteCall::Update(id, patch))
            }
            MutationKind::ToggleStatus => {
                let id = required(task_id)?;
                let mut target = TaskStatus::default();
                let token = self
                    .begin(id.clone(), tag, |current| {
                        let mut task = existing(current, &id)?;
                        task.status = task.status.toggled();
                        target = task.status;
                        Ok(LocalChange::Upsert(task))
                    })
                    .await?;
                (token, RemoteCall::UpdateStatus(id, target))
            }
            MutationKind::TogglePinned => {
                let id = required(task_id)?;
                let mut patch = TaskPatch::new();
                let token = self
                    .begin(id.clone(), tag, |current| {
                        let mut task = existing(current, &id)?;
                        patch = TaskPatch::new().pinned(!task.pinned);
                        task.apply_patch(&patch);
                        Ok(LocalChange::Upsert(task))
                    })
                    .await?;
                (token, RemoteCall::Update(id, patch))
            }
            MutationKind::Delete => {
                let id = required(task_id)?;
                let token = self
                    .begin(id.clone(), tag, |current| {
                        existing(current, &id).map(|_| LocalChange::Hide)
                    })
                    .await?;
                (token, RemoteCall::Delete(id))
            }
        };

        let operation = call.operation();
        let idempotent = call.is_idempotent();
        let remote = Arc::clone(&self.remote);
        let send = move || {
            let remote = Arc::clone(&remote);
            let call = call.clone();
            async move { call.send(remote.as_ref()).await }
        };
        let result = if idempotent {
            self.retry.run(operation, send).await
        } else {
            self.retry.run_once(operation, send).await
        };

        match result {
            Ok(confirmed) => self.commit(token, confirmed).ok_or_else(|| {
                SyncError::Internal(format!("{operation} settled without a task"))
            }),
            Err(error) => Err(self.abort(token, error.escalate())),
        }
    }

    pub async fn create(&self, fields: NewTask) -> SyncResult<Task> {
        self.execute(None, MutationKind::Create(fields)).await
    }

    pub async fn create_follow_up(&self, parent: &TaskId, fields: NewTask) -> SyncResult<Task> {
        self.execute(Some(parent.clone()), MutationKind::CreateFollowUp(fields))
            .await
    }

    pub async fn update_fields(&self, task_id: &TaskId, patch: TaskPatch) -> SyncResult<Task> {
        self.execute(Some(task_id.clone()), MutationKind::Update(patch))
            .await
    }

    pub async fn toggle_status(&self, task_id: &TaskId) -> SyncResult<Task> {
        self.execute(Some(task_id.clone()), MutationKind::ToggleStatus)
            .await
    }

    pub async fn toggle_pinned(&self, task_id: &TaskId) -> SyncResult<Task> {
        self.execute(Some(task_id.clone()), MutationKind::TogglePinned)
            .await
    }

    pub async fn delete(&self, task_id: &TaskId) -> SyncResult<Task> {
        self.execute(Some(task_id.clone()), MutationKind::Delete)
            .await
    }

    async fn begin_create(
        &self,
        tag: MutationKindTag,
        fields: NewTask,
    ) -> SyncResult<(MutationToken, RemoteCall)> {
        let temporary = TaskId::temporary();
        let optimistic = fields.to_optimistic_task(temporary.clone(), Utc::now());
        let token = self
            .begin(temporary, tag, move |_| Ok(LocalChange::Upsert(optimistic)))
            .await?;
        Ok((token, RemoteCall::Create(fields)))
    }
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("retry", &self.retry)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

fn required(task_id: Option<TaskId>) -> SyncResult<TaskId> {
    task_id.ok_or_else(|| SyncError::validation("task_id", "required for this mutation"))
}

fn existing(current: Option<&Task>, task_id: &TaskId) -> SyncResult<Task> {
    current
        .cloned()
        .ok_or_else(|| SyncError::unknown_task(task_id.clone()))
}

/// Re-run inserts held back while creations were pending
fn release_held(cache: &mut TaskCache, changes: &mut Vec<CacheChange>) {
    for (task_id, outcome) in cache.release_held() {
        debug!(task_id = %task_id, verdict = %outcome.verdict(), "Re-ran held insert");
        changes.extend(outcome.change_for(&task_id));
    }
}

/// Undo one mutation's optimistic write inside a single cache write
fn roll_back(
    cache: &mut TaskCache,
    changes: &mut Vec<CacheChange>,
    kind: MutationKindTag,
    snapshot: EntrySnapshot,
    conflicted: Option<TaskId>,
) {
    let task_id = snapshot.task_id().clone();

    if let Some(missing) = conflicted {
        if cache.remove(&missing).is_some() {
            changes.push(CacheChange::Removed(missing.clone()));
        }
        if missing == task_id {
            return;
        }
    }

    if kind.is_create() {
        if cache.discard_temporary(&task_id) {
            changes.push(CacheChange::Removed(task_id));
        }
        release_held(cache, changes);
        return;
    }

    let deferred = cache.restore(snapshot);
    if cache.contains(&task_id) {
        changes.push(CacheChange::Restored(task_id.clone()));
    }
    if let Some(deferred) = deferred {
        let outcome = cache.upsert(deferred.task, deferred.source);
        debug!(
            task_id = %task_id,
            source = %deferred.source,
            verdict = %outcome.verdict(),
            "Re-ran deferred candidate after rollback"
        );
        changes.extend(outcome.change_for(&task_id));
    }
}
