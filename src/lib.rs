#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Task Sync
//!
//! Client-side synchronization engine for a cache of task entities.
//!
//! ## Overview
//!
//! A single in-memory collection of tasks is written by three independent,
//! asynchronous sources:
//!
//! - **Optimistic local mutations** issued by the user
//! - **Confirmations and rejections** returned by the remote store
//! - **A realtime change feed** carrying inserts, updates and deletes from other
//!   clients (and echoes of our own writes)
//!
//! The engine keeps the cache consistent while all three race each other.
//!
//! ## Architecture
//!
//! - [`cache`] - Canonical keyed store plus pagination aggregate
//! - [`reconciliation`] - Pure accept / reject / defer decision function
//! - [`mutation`] - Optimistic writes, per-id serialization, commit and rollback
//! - [`realtime`] - Change feed ingestion routed through reconciliation
//! - [`query`] - Filtered, sorted, paginated projections of a snapshot
//! - [`engine`] - Facade exposed to the presentation layer
//!
//! Supporting modules: [`config`], [`error`], [`events`], [`logging`],
//! [`models`], [`remote`], [`validation`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use task_sync::config::SyncConfig;
//! use task_sync::engine::TaskSyncEngine;
//! use task_sync::mutation::MutationKind;
//! use task_sync::query::{StatusBucket, TaskFilter};
//! use task_sync::test_helpers::{InMemoryRemoteStore, ManualFeed};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = Arc::new(InMemoryRemoteStore::new());
//! let engine = TaskSyncEngine::new(SyncConfig::default(), remote)?;
//! engine.connect_feed(&ManualFeed::new());
//!
//! engine.load_page(1, 20, TaskFilter::default()).await?;
//! let first = engine.get_snapshot()[0].id.clone();
//! engine.issue_mutation(Some(first), MutationKind::ToggleStatus).await?;
//!
//! let done = engine.view(&TaskFilter::from(StatusBucket::Complete), 1, 20);
//! println!("{} complete tasks", done.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod mutation;
pub mod query;
pub mod realtime;
pub mod reconciliation;
pub mod remote;
pub mod test_helpers;
pub mod validation;

pub use cache::{CacheEntry, CacheSnapshot, Pagination, SharedCache, TaskCache};
pub use config::SyncConfig;
pub use engine::TaskSyncEngine;
pub use error::{SyncError, SyncResult};
pub use events::{CacheChange, ChangeNotifier};
pub use models::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
pub use mutation::{MutationCoordinator, MutationKind};
pub use query::{QueryView, StatusBucket, TaskFilter};
pub use realtime::{ChangeFeed, RealtimeIngester};
pub use reconciliation::{ReconciliationPolicy, Verdict, WriteSource};
pub use remote::{RemoteError, RemoteStore};
