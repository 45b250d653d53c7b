//! # System Constants
//!
//! Identifiers, change names and default tunables shared across the engine.

/// Prefix of ids assigned to optimistically created tasks before the remote
/// store hands back the real id
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Names used for structured log fields and change notifications
pub mod changes {
    pub const TASK_INSERTED: &str = "task.inserted";
    pub const TASK_UPDATED: &str = "task.updated";
    pub const TASK_REMOVED: &str = "task.removed";
    pub const TASK_RESTORED: &str = "task.restored";
    pub const TASK_REPLACED: &str = "task.replaced";
    pub const PAGE_LOADED: &str = "page.loaded";
    pub const STALE_CHANGED: &str = "cache.stale_changed";
}

/// Defaults for [`crate::config::SyncConfig`]
pub mod defaults {
    pub const PAGE_SIZE: u32 = 20;
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
    pub const MAX_RETRIES: u32 = 2;
    pub const RETRY_BACKOFF_BASE_MS: u64 = 200;
    pub const RETRY_BACKOFF_MAX_MS: u64 = 2_000;
    pub const TOMBSTONE_CAPACITY: usize = 1_024;
    pub const FEED_ENTITY: &str = "tasks";
}

/// Field limits enforced before a mutation is dispatched
pub mod limits {
    pub const TITLE_MAX_CHARS: usize = 200;
    pub const DESCRIPTION_MAX_CHARS: usize = 2_000;
}
