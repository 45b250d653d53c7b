//! # Remote Store Interface
//!
//! The authoritative backend the cache synchronizes against. Every operation
//! returns a tagged result; expected failures (rejections, missing entities)
//! are values, not panics.

pub mod retry;

use crate::error::SyncError;
use crate::models::{NewTask, Task, TaskId, TaskPage, TaskPatch, TaskStatus};
use crate::query::TaskFilter;
use async_trait::async_trait;
use thiserror::Error;

pub use retry::RetryPolicy;

/// Failure reported by the remote store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Request sent, no usable response
    #[error("network failure: {0}")]
    Network(String),

    /// Explicit failure response
    #[error("rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The entity no longer exists
    #[error("not found: {0}")]
    NotFound(TaskId),
}

impl RemoteError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(message) => SyncError::network("remote", message),
            RemoteError::Rejected { code, message } => SyncError::ServerRejection { code, message },
            RemoteError::NotFound(task_id) => SyncError::Conflict { task_id },
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn create(&self, fields: NewTask) -> RemoteResult<Task>;

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> RemoteResult<Task>;

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> RemoteResult<Task>;

    async fn delete(&self, id: &TaskId) -> RemoteResult<()>;

    async fn list(&self, page: u32, page_size: u32, filter: &TaskFilter) -> RemoteResult<TaskPage>;
}

/// A single write request, planned when a mutation begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create(NewTask),
    Update(TaskId, TaskPatch),
    UpdateStatus(TaskId, TaskStatus),
    Delete(TaskId),
}

impl RemoteCall {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(..) => "update",
            Self::UpdateStatus(..) => "update_status",
            Self::Delete(_) => "delete",
        }
    }

    /// Whether resending after a lost response is safe. A second create would
    /// add a second row.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Create(_))
    }

    /// Send the request. Deletions confirm with no task.
    pub async fn send(self, remote: &dyn RemoteStore) -> RemoteResult<Option<Task>> {
        match self {
            Self::Create(fields) => remote.create(fields).await.map(Some),
            Self::Update(id, patch) => remote.update(&id, patch).await.map(Some),
            Self::UpdateStatus(id, status) => remote.update_status(&id, status).await.map(Some),
            Self::Delete(id) => remote.delete(&id).await.map(|()| None),
        }
    }
}
