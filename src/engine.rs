//! # Task Sync Engine
//!
//! Facade handed to the presentation layer. Owns the shared cache and wires
//! the mutation coordinator, the realtime ingester and the remote store
//! together.
//!
//! ## Surface
//!
//! - [`TaskSyncEngine::get_snapshot`] - immutable copy of the visible tasks
//! - [`TaskSyncEngine::subscribe_to_changes`] - observer registration
//! - [`TaskSyncEngine::issue_mutation`] - optimistic write, resolved once the
//!   cache has settled
//! - [`TaskSyncEngine::view`] - filtered page via [`QueryView`]
//! - [`TaskSyncEngine::load_page`] / [`TaskSyncEngine::resync`] - fetch path

use crate::cache::{CacheSnapshot, Pagination, SharedCache, TaskCache};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::{CacheChange, ChangeNotifier, ListenerId};
use crate::models::{Task, TaskId};
use crate::mutation::{MutationCoordinator, MutationKind};
use crate::query::{QueryView, TaskFilter};
use crate::realtime::{ChangeFeed, RealtimeIngester};
use crate::reconciliation::WriteSource;
use crate::remote::{RemoteStore, RetryPolicy};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument};

/// Handle returned by [`TaskSyncEngine::subscribe_to_changes`]
#[derive(Debug)]
pub struct ChangeSubscription {
    id: ListenerId,
    notifier: ChangeNotifier,
}

impl ChangeSubscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Returns false if the listener was already removed
    pub fn unsubscribe(self) -> bool {
        self.notifier.unsubscribe(self.id)
    }
}

pub struct TaskSyncEngine {
    config: SyncConfig,
    cache: SharedCache,
    remote: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    coordinator: Arc<MutationCoordinator>,
    ingester: Arc<RealtimeIngester>,
    /// Filter of the most recent page load, reused by `resync`
    last_filter: Mutex<TaskFilter>,
}

impl TaskSyncEngine {
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteStore>) -> SyncResult<Self> {
        config.validate()?;

        let mut cache = TaskCache::new(config.tombstone_capacity);
        cache.set_pagination(Pagination::new(1, config.page_size, 0));
        let cache = SharedCache::new(cache);
        let retry = RetryPolicy::from_config(&config);
        let coordinator = Arc::new(MutationCoordinator::new(
            cache.clone(),
            Arc::clone(&remote),
            retry.clone(),
        ));
        let ingester = RealtimeIngester::new(cache.clone());

        info!(
            page_size = config.page_size,
            request_timeout_ms = config.request_timeout_ms,
            max_retries = config.max_retries,
            "Task sync engine initialized"
        );

        Ok(Self {
            config,
            cache,
            remote,
            retry,
            coordinator,
            ingester,
            last_filter: Mutex::new(TaskFilter::default()),
        })
    }

    /// Start consuming the change feed for the configured entity
    pub fn connect_feed(&self, feed: &dyn ChangeFeed) -> bool {
        self.ingester.start(feed, &self.config.feed_entity)
    }

    pub fn disconnect_feed(&self) {
        self.ingester.stop();
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &Arc<MutationCoordinator> {
        &self.coordinator
    }

    pub fn ingester(&self) -> &Arc<RealtimeIngester> {
        &self.ingester
    }

    /// Visible tasks ordered by id
    pub fn get_snapshot(&self) -> Vec<Task> {
        self.cache.snapshot().to_vec()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.cache.read(|cache| cache.get(id).cloned())
    }

    pub fn pagination(&self) -> Pagination {
        self.cache.read(TaskCache::pagination)
    }

    /// True after a feed disconnect until the next successful `resync`
    pub fn is_stale(&self) -> bool {
        self.cache.read(TaskCache::is_stale)
    }

    /// `listener` fires after every accepted cache write
    pub fn subscribe_to_changes(
        &self,
        listener: impl Fn(&CacheChange) + Send + Sync + 'static,
    ) -> ChangeSubscription {
        let notifier = self.cache.notifier().clone();
        let id = notifier.subscribe(listener);
        ChangeSubscription { id, notifier }
    }

    /// Run a mutation to completion on its own task. The returned future
    /// resolves after the cache has reached its final state for the
    /// mutation; dropping it does not cancel the mutation.
    ///
    /// A target missing from the cache surfaces as `Conflict` when it was
    /// deleted and as `Validation` otherwise.
    pub async fn issue_mutation(&self, task_id: Option<TaskId>, kind: MutationKind) -> SyncResult<Task> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move { coordinator.execute(task_id, kind).await })
            .await
            .map_err(|err| SyncError::Internal(format!("mutation task failed: {err}")))?
            .map_err(|err| self.surface(err))
    }

    pub fn view(&self, filter: &TaskFilter, page: u32, page_size: u32) -> Vec<Task> {
        QueryView::view(&self.cache.snapshot(), filter, page, page_size, Utc::now())
    }

    /// Fetch one page from the remote store and merge it into the cache.
    ///
    /// Items are upserted with source `Fetch`, so they are deferred behind
    /// pending mutations and never resurrect deleted ids. The pagination
    /// aggregate is replaced with the page's totals, corrected for rows that
    /// exist only locally or are optimistically deleted.
    #[instrument(skip(self, filter))]
    pub async fn load_page(&self, page: u32, page_size: u32, filter: TaskFilter) -> SyncResult<Pagination> {
        *self.last_filter.lock() = filter.clone();

        let remote = Arc::clone(&self.remote);
        let result = self
            .retry
            .run("list", move || {
                let remote = Arc::clone(&remote);
                let filter = filter.clone();
                async move { remote.list(page, page_size, &filter).await }
            })
            .await?;

        let fetched = Pagination::new(page.max(1), page_size, result.total_count);
        let item_count = result.items.len();
        let pagination = self.cache.write(|cache, changes| {
            for task in result.items {
                let id = task.id.clone();
                let outcome = cache.upsert(task, WriteSource::Fetch);
                changes.extend(outcome.change_for(&id));
            }
            let pagination = cache.set_fetched_pagination(fetched);
            changes.push(CacheChange::PageLoaded {
                page: pagination.current_page,
                total_count: pagination.total_count,
            });
            pagination
        });

        info!(
            page = pagination.current_page,
            items = item_count,
            total_count = pagination.total_count,
            "Loaded task page"
        );
        Ok(pagination)
    }

    /// Re-fetch the current page after a feed outage and clear the stale
    /// flag. On failure the cache stays stale; while the feed is still down
    /// this fails with [`SyncError::RealtimeDisconnect`].
    pub async fn resync(&self) -> SyncResult<Pagination> {
        self.ingester.ensure_connected()?;
        let current = self.pagination();
        let filter = self.last_filter.lock().clone();
        let pagination = self
            .load_page(current.current_page, current.page_size, filter)
            .await?;

        self.cache.write(|cache, changes| {
            if cache.set_stale(false) {
                changes.push(CacheChange::StaleChanged(false));
            }
        });
        info!("Cache resynchronized");
        Ok(pagination)
    }
}

impl TaskSyncEngine {
    fn surface(&self, err: SyncError) -> SyncError {
        match err {
            SyncError::UnknownTask { task_id } => {
                if self.cache.read(|cache| cache.is_deleted(&task_id)) {
                    SyncError::conflict(task_id)
                } else {
                    SyncError::validation("task_id", format!("unknown task {task_id}"))
                }
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for TaskSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSyncEngine")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("ingester", &self.ingester)
            .finish()
    }
}
