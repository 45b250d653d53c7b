use super::builders::ts;
use crate::cache::TaskCache;
use crate::models::{NewTask, Task, TaskId, TaskPage, TaskPatch, TaskStatus};
use crate::query::{QueryView, TaskFilter};
use crate::reconciliation::WriteSource;
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Default)]
struct StoreState {
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
    clock: i64,
    failures: VecDeque<RemoteError>,
    calls: Vec<&'static str>,
    latency: Option<Duration>,
}

impl StoreState {
    /// Server timestamps only move forward
    fn tick(&mut self, previous: Option<&Task>) -> chrono::DateTime<Utc> {
        self.clock += 1;
        let next = ts(1_000 + self.clock);
        match previous {
            Some(task) if task.updated_at >= next => task.updated_at + chrono::Duration::seconds(1),
            _ => next,
        }
    }
}

/// Authoritative store kept in memory.
///
/// Failures can be scripted per call with [`Self::fail_next`], and calls can
/// be parked at a gate with [`Self::hold`] to observe in-flight state.
#[derive(Clone)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<StoreState>>,
    gate: Arc<Semaphore>,
    held: Arc<AtomicBool>,
    waiting: Arc<AtomicUsize>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            gate: Arc::new(Semaphore::new(0)),
            held: Arc::new(AtomicBool::new(false)),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn seed(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut state = self.state.lock();
        for task in tasks {
            state.tasks.insert(task.id.clone(), task);
        }
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().tasks.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next call fail with `error`; queued failures apply in order
    pub fn fail_next(&self, error: RemoteError) {
        self.state.lock().failures.push_back(error);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    /// Park every subsequent call until released
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    /// Release parked calls and stop parking new ones
    pub fn release_all(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(self.waiting.load(Ordering::SeqCst));
    }

    /// Calls currently parked at the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Shared prologue: record the call, wait out latency and the gate, then
    /// pop a scripted failure if any
    async fn enter(&self, operation: &'static str) -> RemoteResult<()> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(operation);
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.held.load(Ordering::SeqCst) {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            match permit {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(RemoteError::Network("gate closed".to_string())),
            }
        }
        match self.state.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn create(&self, fields: NewTask) -> RemoteResult<Task> {
        self.enter("create").await?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TaskId::new(format!("srv-{}", state.next_id));
        let now = state.tick(None);
        let task = fields.to_optimistic_task(id.clone(), now);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> RemoteResult<Task> {
        self.enter("update").await?;
        let mut state = self.state.lock();
        let mut task = state
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        task.apply_patch(&patch);
        task.updated_at = state.tick(Some(&task));
        state.tasks.insert(id.clone(), task.clone());
        Ok(task)
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> RemoteResult<Task> {
        self.enter("update_status").await?;
        let mut state = self.state.lock();
        let mut task = state
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        task.status = status;
        task.updated_at = state.tick(Some(&task));
        state.tasks.insert(id.clone(), task.clone());
        Ok(task)
    }

    async fn delete(&self, id: &TaskId) -> RemoteResult<()> {
        self.enter("delete").await?;
        self.state
            .lock()
            .tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }

    async fn list(&self, page: u32, page_size: u32, filter: &TaskFilter) -> RemoteResult<TaskPage> {
        self.enter("list").await?;
        let mut scratch = TaskCache::default();
        for task in self.state.lock().tasks.values() {
            scratch.upsert(task.clone(), WriteSource::Fetch);
        }
        let snapshot = scratch.snapshot();
        let now = Utc::now();
        Ok(TaskPage {
            items: QueryView::view(&snapshot, filter, page, page_size, now),
            total_count: QueryView::count(&snapshot, filter, now) as u64,
        })
    }
}
