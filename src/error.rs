//! # Sync Error Types
//!
//! Structured error handling for the synchronization engine using thiserror.
//!
//! Only [`SyncError::Validation`], [`SyncError::ServerRejection`] and
//! [`SyncError::Conflict`] are meant to reach the presentation layer. Every
//! other variant is consumed internally (retried, escalated or logged).

use crate::models::TaskId;
use thiserror::Error;

/// Errors produced by the cache, the mutation path and the realtime path
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },

    #[error("Server rejected request ({code}): {message}")]
    ServerRejection { code: String, message: String },

    #[error("Conflict: task {task_id} no longer exists")]
    Conflict { task_id: TaskId },

    #[error("Realtime feed disconnected: {reason}")]
    RealtimeDisconnect { reason: String },

    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: TaskId },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create a validation error for a specific field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error for a remote operation
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a server rejection error
    pub fn server_rejection(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServerRejection {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a conflict error for a task the remote store no longer has
    pub fn conflict(task_id: impl Into<TaskId>) -> Self {
        Self::Conflict {
            task_id: task_id.into(),
        }
    }

    /// Create an unknown task error
    pub fn unknown_task(task_id: impl Into<TaskId>) -> Self {
        Self::UnknownTask {
            task_id: task_id.into(),
        }
    }

    /// Turn an exhausted network failure into a server rejection.
    ///
    /// Mutations never surface `Network` to callers: once retries run out the
    /// optimistic state is rolled back and the caller sees a rejection.
    pub fn escalate(self) -> Self {
        match self {
            Self::Network { operation, message } => Self::ServerRejection {
                code: "network_exhausted".to_string(),
                message: format!("{operation}: {message}"),
            },
            other => other,
        }
    }

    /// Whether this error is allowed to propagate to the presentation layer
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::ServerRejection { .. } | Self::Conflict { .. }
        )
    }

    /// Stable short name used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Network { .. } => "network",
            Self::ServerRejection { .. } => "server_rejection",
            Self::Conflict { .. } => "conflict",
            Self::RealtimeDisconnect { .. } => "realtime_disconnect",
            Self::UnknownTask { .. } => "unknown_task",
            Self::Configuration(_) => "configuration",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
