//! # Query View
//!
//! Stateless projection from a cache snapshot to the list a consumer renders.
//! Views never write to the cache.

pub mod filter;
pub mod view;

pub use filter::{StatusBucket, TaskFilter};
pub use view::QueryView;
