use serde::{Deserialize, Serialize};

/// Aggregate describing the visible page of the task list.
///
/// `total_count` moves only on structural changes (inserts and deletes);
/// field-only mutations never touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl Pagination {
    pub fn new(current_page: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            current_page,
            page_size,
            total_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    /// Apply a signed structural delta, never going below zero
    pub(crate) fn apply_delta(&mut self, delta: i64) {
        self.total_count = self.total_count.saturating_add_signed(delta);
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, crate::constants::defaults::PAGE_SIZE, 0)
    }
}
