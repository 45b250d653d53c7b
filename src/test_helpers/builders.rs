use crate::models::{Task, TaskId, TaskStatus};
use chrono::{DateTime, TimeZone, Utc};

/// Fixed instant `secs` seconds after 2024-01-01T00:00:00Z
pub fn ts(secs: i64) -> DateTime<Utc> {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
    epoch + chrono::Duration::seconds(secs)
}

/// Builder for tasks with predictable defaults
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            task: Task {
                id: TaskId::new(id),
                title: format!("Task {id}"),
                description: None,
                status: TaskStatus::Pending,
                due_date: None,
                pinned: false,
                owner_id: "user-1".to_string(),
                assignee_id: None,
                parent_task_id: None,
                photo_url: None,
                url_link: None,
                created_at: ts(0),
                updated_at: ts(0),
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.task.title = title.to_string();
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.task.due_date = Some(due_date);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.task.pinned = pinned;
        self
    }

    pub fn owner(mut self, owner_id: &str) -> Self {
        self.task.owner_id = owner_id.to_string();
        self
    }

    pub fn assignee(mut self, assignee_id: &str) -> Self {
        self.task.assignee_id = Some(assignee_id.to_string());
        self
    }

    pub fn parent(mut self, parent_task_id: &str) -> Self {
        self.task.parent_task_id = Some(TaskId::new(parent_task_id));
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.task.created_at = created_at;
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.task.updated_at = updated_at;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
