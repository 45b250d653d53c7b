use crate::models::TaskId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Default)]
struct Lane {
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Per-id FIFO admission for mutations.
///
/// The holder of a [`LaneGuard`] is the only mutation allowed to touch that
/// id. Later requests wait in arrival order; dropping the guard hands the lane
/// to the next live waiter, or frees it when nobody is waiting.
#[derive(Clone, Default)]
pub struct MutationLanes {
    lanes: Arc<DashMap<TaskId, Lane>>,
}

impl MutationLanes {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, task_id: &TaskId) -> LaneGuard {
        let receiver = match self.lanes.entry(task_id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Lane::default());
                None
            }
            Entry::Occupied(mut occupied) => {
                let (sender, receiver) = oneshot::channel();
                occupied.get_mut().waiters.push_back(sender);
                Some(receiver)
            }
        };

        if let Some(receiver) = receiver {
            debug!(task_id = %task_id, "Mutation queued behind in-flight write");
            let mut waiting = Waiting {
                lanes: self,
                task_id,
                receiver,
                admitted: false,
            };
            // A closed sender means the lane was torn down; proceed either way
            let _ = (&mut waiting.receiver).await;
            waiting.admitted = true;
        }

        LaneGuard {
            lanes: self.clone(),
            task_id: task_id.clone(),
        }
    }

    /// Whether a mutation currently holds the lane for `task_id`
    pub fn is_busy(&self, task_id: &TaskId) -> bool {
        self.lanes.contains_key(task_id)
    }

    /// Mutations waiting behind the current holder
    pub fn queued(&self, task_id: &TaskId) -> usize {
        self.lanes
            .get(task_id)
            .map_or(0, |lane| lane.waiters.len())
    }

    fn release(&self, task_id: &TaskId) {
        if let Entry::Occupied(mut occupied) = self.lanes.entry(task_id.clone()) {
            while let Some(next) = occupied.get_mut().waiters.pop_front() {
                if next.send(()).is_ok() {
                    return;
                }
            }
            occupied.remove();
        }
    }
}

/// A waiter dropped mid-wait must not strand a lane it was already handed
struct Waiting<'a> {
    lanes: &'a MutationLanes,
    task_id: &'a TaskId,
    receiver: oneshot::Receiver<()>,
    admitted: bool,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        if self.admitted {
            return;
        }
        self.receiver.close();
        if self.receiver.try_recv().is_ok() {
            self.lanes.release(self.task_id);
        }
    }
}

/// Exclusive right to mutate one id; released on drop
pub struct LaneGuard {
    lanes: MutationLanes,
    task_id: TaskId,
}

impl LaneGuard {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        self.lanes.release(&self.task_id);
    }
}

impl std::fmt::Debug for LaneGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneGuard")
            .field("task_id", &self.task_id)
            .finish()
    }
}
