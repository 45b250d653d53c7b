use super::TaskFilter;
use crate::cache::CacheSnapshot;
use crate::models::Task;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Pure projection over a [`CacheSnapshot`].
///
/// The clock is an explicit input, so equal arguments always give equal
/// output and callers can memoize on them.
pub struct QueryView;

impl QueryView {
    /// Filtered, sorted page of tasks. Pages are 1-based; page 0 is treated as
    /// page 1 and a zero page size yields nothing.
    pub fn view(
        snapshot: &CacheSnapshot,
        filter: &TaskFilter,
        page: u32,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> Vec<Task> {
        if page_size == 0 {
            return Vec::new();
        }

        let mut matching: Vec<&Task> = snapshot
            .tasks()
            .iter()
            .filter(|task| filter.matches(task, now))
            .collect();
        matching.sort_by(|a, b| Self::compare(a, b));

        let page_size = page_size as usize;
        let offset = (page.max(1) as usize - 1).saturating_mul(page_size);
        matching
            .into_iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect()
    }

    /// Number of tasks matching `filter` across all pages
    pub fn count(snapshot: &CacheSnapshot, filter: &TaskFilter, now: DateTime<Utc>) -> usize {
        snapshot
            .tasks()
            .iter()
            .filter(|task| filter.matches(task, now))
            .count()
    }

    /// Pinned first, then earliest due date (undated last), then newest
    /// created, then id as the final tie-break
    fn compare(a: &Task, b: &Task) -> Ordering {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}
