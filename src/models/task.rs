//! # Task Model
//!
//! The task entity as held by the cache, plus the creation and patch payloads
//! used by mutations.
//!
//! ## Status
//!
//! Three statuses exist on the wire (`pending`, `overdue`, `complete`) but only
//! `pending` and `complete` are ever written by a toggle. Whether a task is
//! overdue is decided at read time from `due_date` (see [`Task::is_overdue_at`]).

use crate::constants::TEMP_ID_PREFIX;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique task identifier assigned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh local id for an optimistic creation
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&TaskId> for TaskId {
    fn from(id: &TaskId) -> Self {
        id.clone()
    }
}

/// Stored task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Overdue,
    Complete,
}

impl TaskStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Target of a completion toggle. A stored `overdue` toggles like `pending`.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Complete => Self::Pending,
            Self::Pending | Self::Overdue => Self::Complete,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Overdue => write!(f, "overdue"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// A task entity as confirmed by the remote store (or optimistically predicted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    pub owner_id: String,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub url_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A task is overdue when it is not complete and its due date has passed.
    /// A stored `overdue` status carries no weight of its own.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_complete() && self.due_date.is_some_and(|due| due < now)
    }

    /// Apply the fields present in `patch`. `updated_at` is left alone; only the
    /// remote store advances it.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(pinned) = patch.pinned {
            self.pinned = pinned;
        }
        if let Some(assignee_id) = &patch.assignee_id {
            self.assignee_id.clone_from(assignee_id);
        }
        if let Some(photo_url) = &patch.photo_url {
            self.photo_url.clone_from(photo_url);
        }
        if let Some(url_link) = &patch.url_link {
            self.url_link.clone_from(url_link);
        }
    }
}

/// Fields for a task creation request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    pub owner_id: String,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub url_link: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_assignee(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn with_url_link(mut self, url_link: impl Into<String>) -> Self {
        self.url_link = Some(url_link.into());
        self
    }

    /// Predict the entity the remote store will create, under a local id
    pub fn to_optimistic_task(&self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            status: TaskStatus::Pending,
            due_date: self.due_date,
            pinned: self.pinned,
            owner_id: self.owner_id.clone(),
            assignee_id: self.assignee_id.clone(),
            parent_task_id: self.parent_task_id.clone(),
            photo_url: self.photo_url.clone(),
            url_link: self.url_link.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial field update. `None` leaves a field untouched; `Some(None)` clears
/// an optional field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_link: Option<Option<String>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn assignee(mut self, assignee_id: Option<String>) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn photo_url(mut self, photo_url: Option<String>) -> Self {
        self.photo_url = Some(photo_url);
        self
    }

    pub fn url_link(mut self, url_link: Option<String>) -> Self {
        self.url_link = Some(url_link);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One page of tasks returned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub total_count: u64,
}
