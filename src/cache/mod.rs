//! # Task Cache
//!
//! Canonical keyed store of task entries plus the pagination aggregate.
//!
//! The cache is the sole owner of entries. The mutation coordinator and the
//! realtime ingester are its only writers and both go through
//! [`TaskCache::upsert`], which consults the reconciliation policy before
//! touching anything.

pub mod entry;
pub mod pagination;
pub mod shared;
pub mod snapshot;
pub mod task_cache;
mod tombstones;

pub use entry::{CacheEntry, DeferredCandidate, MutationId};
pub use pagination::Pagination;
pub use shared::SharedCache;
pub use snapshot::{CacheSnapshot, EntrySnapshot};
pub use task_cache::{CacheStats, RejectReason, TaskCache, UpsertOutcome};
