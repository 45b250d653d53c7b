//! # Mutation Coordination
//!
//! Optimistic local writes with per-id serialization.
//!
//! Every user-initiated write goes through the same three steps:
//!
//! 1. `begin` waits for the id's lane, captures the entry, applies the local
//!    transform and sets the pending token, all in one cache write.
//! 2. The remote call runs (with timeout and retry).
//! 3. `commit` settles on the confirmed task, or `abort` puts the captured
//!    entry back. Either way, a realtime write deferred in the meantime is
//!    re-run through reconciliation before the lane passes to the next
//!    queued mutation.
//!
//! Per id the states progress Idle -> Pending -> Committed | Aborted -> Idle.

pub mod coordinator;
pub mod kind;
pub mod lanes;

pub use coordinator::{MutationCoordinator, MutationToken};
pub use kind::{LocalChange, MutationKind, MutationKindTag};
pub use lanes::{LaneGuard, MutationLanes};
