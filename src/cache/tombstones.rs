use crate::models::TaskId;
use std::collections::{HashSet, VecDeque};

/// Bounded FIFO set of deleted ids.
///
/// Deletion is terminal and ids are never reused, so any later write for a
/// remembered id is a stale echo.
#[derive(Debug, Clone)]
pub(crate) struct Tombstones {
    ids: HashSet<TaskId>,
    order: VecDeque<TaskId>,
    capacity: usize,
}

impl Tombstones {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn insert(&mut self, id: TaskId) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }

    pub(crate) fn contains(&self, id: &TaskId) -> bool {
        self.ids.contains(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}
