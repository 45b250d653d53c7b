//! Shared setup for the integration suite.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;
use task_sync::config::SyncConfig;
use task_sync::engine::TaskSyncEngine;
use task_sync::models::{Task, TaskId};
use task_sync::query::TaskFilter;
use task_sync::test_helpers::{InMemoryRemoteStore, ManualFeed};

/// Engine wired to an in-memory remote store and a manual feed, with the
/// store's tasks already loaded into the cache
pub struct Harness {
    pub engine: Arc<TaskSyncEngine>,
    pub remote: Arc<InMemoryRemoteStore>,
    pub feed: ManualFeed,
}

impl Harness {
    pub async fn with_tasks(tasks: Vec<Task>) -> Self {
        Self::with_config(SyncConfig::default(), tasks).await
    }

    pub async fn with_config(config: SyncConfig, tasks: Vec<Task>) -> Self {
        let remote = Arc::new(InMemoryRemoteStore::new());
        remote.seed(tasks);

        let engine = TaskSyncEngine::new(config, remote.clone()).expect("valid config");
        let feed = ManualFeed::new();
        assert!(engine.connect_feed(&feed));
        engine
            .load_page(1, 50, TaskFilter::default())
            .await
            .expect("initial page load");

        Self {
            engine: Arc::new(engine),
            remote,
            feed,
        }
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.engine.get(&TaskId::new(id))
    }

    pub fn total_count(&self) -> u64 {
        self.engine.pagination().total_count
    }
}

/// Tight timeouts so retry tests finish quickly under paused time
pub fn fast_retry_config() -> SyncConfig {
    SyncConfig {
        request_timeout_ms: 500,
        max_retries: 2,
        retry_backoff_base_ms: 50,
        retry_backoff_max_ms: 100,
        ..SyncConfig::default()
    }
}
