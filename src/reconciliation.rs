//! # Reconciliation Policy
//!
//! Pure decision function that gates every candidate write into the cache.
//!
//! Rules, in priority order:
//!
//! 1. A local write is in flight for the id and the candidate is not that
//!    write's own commit: **defer** it into the entry's single deferred slot.
//! 2. The candidate's `updated_at` is strictly older than the entry's:
//!    **reject** it as stale.
//! 3. Otherwise **accept** it (last writer wins, ties included).

use crate::cache::CacheEntry;
use crate::models::Task;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a candidate write came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteSource {
    /// The local mutation path (optimistic write or its commit)
    Mutation,
    /// The realtime change feed
    Realtime,
    /// A page fetched from the remote store
    Fetch,
}

impl fmt::Display for WriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutation => write!(f, "mutation"),
            Self::Realtime => write!(f, "realtime"),
            Self::Fetch => write!(f, "fetch"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accept,
    Reject,
    Defer,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
            Self::Defer => write!(f, "defer"),
        }
    }
}

pub struct ReconciliationPolicy;

impl ReconciliationPolicy {
    /// Decide what to do with `candidate` given the current entry for its id.
    ///
    /// An absent entry always accepts; deleted ids are screened out by the
    /// cache before this is consulted.
    pub fn decide(current: Option<&CacheEntry>, candidate: &Task, source: WriteSource) -> Verdict {
        let Some(entry) = current else {
            return Verdict::Accept;
        };

        if entry.pending_mutation_id().is_some() && source != WriteSource::Mutation {
            return Verdict::Defer;
        }

        if candidate.updated_at < entry.updated_at() {
            return Verdict::Reject;
        }

        Verdict::Accept
    }
}
