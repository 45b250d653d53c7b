use crate::error::{SyncError, SyncResult};
use crate::models::{Task, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A row-level change as delivered by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub record: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_record: Option<Value>,
}

impl ChangeEvent {
    pub fn new(change_type: ChangeType, record: Value) -> Self {
        Self {
            change_type,
            record,
            previous_record: None,
        }
    }

    /// Id of the affected row. Delete events may carry it only in the
    /// previous record.
    pub fn task_id(&self) -> Option<TaskId> {
        [Some(&self.record), self.previous_record.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|record| record.get("id").and_then(Value::as_str))
            .map(TaskId::from)
    }

    /// Decode the record into a candidate task
    pub fn candidate(&self) -> SyncResult<Task> {
        Task::deserialize(&self.record).map_err(SyncError::from)
    }
}

/// Everything a feed handler can receive
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    /// The subscription dropped; cached data can no longer be trusted
    Disconnected { reason: String },
    Reconnected,
}

pub type FeedHandler = Arc<dyn Fn(FeedMessage) + Send + Sync>;

/// Handle returned by [`ChangeFeed::subscribe`]; dropping it unsubscribes
pub struct FeedSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl FeedSubscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// External push feed of row changes
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, entity: &str, handler: FeedHandler) -> FeedSubscription;
}
