//! # Models
//!
//! Task entity and the request payloads the mutation path sends to the
//! remote store.

pub mod task;

pub use task::{NewTask, Task, TaskId, TaskPage, TaskPatch, TaskStatus};
