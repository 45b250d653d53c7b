// Test Helpers Module - In-Process Collaborators
//
// Deterministic stand-ins for the remote store and the change feed, plus task
// builders. Used by unit tests, the integration suite and the crate docs.

pub mod builders;
pub mod feed;
pub mod remote;

pub use builders::{ts, TaskBuilder};
pub use feed::ManualFeed;
pub use remote::InMemoryRemoteStore;

/// Yield to the runtime until `condition` holds.
///
/// Panics after a bounded number of polls so a broken test fails instead of
/// hanging.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
