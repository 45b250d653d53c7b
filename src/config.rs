//! # Sync Configuration
//!
//! Layered configuration for the engine: built-in defaults, then an optional
//! TOML file, then `TASK_SYNC_*` environment variables.

use crate::constants::defaults;
use crate::error::{SyncError, SyncResult};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for overrides (`TASK_SYNC_PAGE_SIZE`, ...)
pub const ENV_PREFIX: &str = "TASK_SYNC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size used by `resync` and as the initial pagination aggregate
    pub page_size: u32,
    /// Bound on a single remote call before it counts as a network failure
    pub request_timeout_ms: u64,
    /// Retries after the first attempt for network failures and timeouts
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
    /// How many deleted ids are remembered to block resurrection
    pub tombstone_capacity: usize,
    /// Entity name passed to the change feed subscription
    pub feed_entity: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            max_retries: defaults::MAX_RETRIES,
            retry_backoff_base_ms: defaults::RETRY_BACKOFF_BASE_MS,
            retry_backoff_max_ms: defaults::RETRY_BACKOFF_MAX_MS,
            tombstone_capacity: defaults::TOMBSTONE_CAPACITY,
            feed_entity: defaults::FEED_ENTITY.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load defaults, overlay `path` when given, then environment overrides
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading sync configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> SyncResult<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.page_size == 0 {
            return Err(SyncError::Configuration(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SyncError::Configuration(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry_backoff_max_ms < self.retry_backoff_base_ms {
            return Err(SyncError::Configuration(format!(
                "retry_backoff_max_ms ({}) is below retry_backoff_base_ms ({})",
                self.retry_backoff_max_ms, self.retry_backoff_base_ms
            )));
        }
        if self.feed_entity.trim().is_empty() {
            return Err(SyncError::Configuration(
                "feed_entity must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    pub fn retry_backoff_max(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_max_ms)
    }
}
