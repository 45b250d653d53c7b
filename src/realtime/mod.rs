//! # Realtime Ingestion
//!
//! Consumes the external change feed and turns its events into candidate
//! cache writes. The feed is best effort: events may be duplicated, dropped or
//! reordered, so ordering for a single id is left to the reconciliation
//! policy's `updated_at` comparison.

pub mod feed;
pub mod ingester;

pub use feed::{ChangeEvent, ChangeFeed, ChangeType, FeedHandler, FeedMessage, FeedSubscription};
pub use ingester::{IngestOutcome, RealtimeIngester};
