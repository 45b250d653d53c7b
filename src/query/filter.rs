use crate::models::{Task, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-time status classification.
///
/// `Overdue` is derived from `due_date` and the clock, so a task can move from
/// `Pending` to `Overdue` with no cache write at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    #[default]
    All,
    Pending,
    Overdue,
    Complete,
}

impl StatusBucket {
    /// The bucket `task` falls into at `now`; never `All`
    pub fn classify(task: &Task, now: DateTime<Utc>) -> Self {
        match task.status {
            TaskStatus::Complete => Self::Complete,
            TaskStatus::Pending | TaskStatus::Overdue if task.is_overdue_at(now) => Self::Overdue,
            TaskStatus::Pending | TaskStatus::Overdue => Self::Pending,
        }
    }

    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            bucket => *bucket == Self::classify(task, now),
        }
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Pending => write!(f, "pending"),
            Self::Overdue => write!(f, "overdue"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for StatusBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "overdue" => Ok(Self::Overdue),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("Invalid status filter: {s}")),
        }
    }
}

/// Predicate applied by [`super::QueryView`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: StatusBucket,
    pub owner_id: Option<String>,
    pub assignee_id: Option<String>,
    pub parent_task_id: Option<TaskId>,
    pub pinned_only: bool,
}

impl TaskFilter {
    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn assigned_to(mut self, assignee_id: impl Into<String>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn follow_ups_of(mut self, parent_task_id: impl Into<TaskId>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned_only = true;
        self
    }

    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        self.status.matches(task, now)
            && self.owner_id.as_ref().map_or(true, |owner| *owner == task.owner_id)
            && self
                .assignee_id
                .as_ref()
                .map_or(true, |assignee| task.assignee_id.as_ref() == Some(assignee))
            && self
                .parent_task_id
                .as_ref()
                .map_or(true, |parent| task.parent_task_id.as_ref() == Some(parent))
            && (!self.pinned_only || task.pinned)
    }
}

impl From<StatusBucket> for TaskFilter {
    fn from(status: StatusBucket) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}
