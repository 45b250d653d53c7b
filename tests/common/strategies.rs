//! Proptest strategies for cache operation sequences.

use proptest::prelude::*;
use task_sync::models::{Task, TaskStatus};
use task_sync::reconciliation::WriteSource;
use task_sync::test_helpers::{ts, TaskBuilder};

/// One raw cache operation
#[derive(Debug, Clone)]
pub enum CacheOp {
    Upsert { id: u8, secs: i64, source: WriteSource },
    Remove { id: u8 },
}

pub fn task_id_strategy() -> impl Strategy<Value = u8> {
    0u8..6
}

pub fn source_strategy() -> impl Strategy<Value = WriteSource> {
    prop_oneof![
        Just(WriteSource::Mutation),
        Just(WriteSource::Realtime),
        Just(WriteSource::Fetch),
    ]
}

pub fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (task_id_strategy(), 0i64..20, source_strategy())
            .prop_map(|(id, secs, source)| CacheOp::Upsert { id, secs, source }),
        1 => task_id_strategy().prop_map(|id| CacheOp::Remove { id }),
    ]
}

pub fn task_strategy() -> impl Strategy<Value = Task> {
    (task_id_strategy(), 0i64..20, any::<bool>(), any::<bool>()).prop_map(
        |(id, secs, pinned, complete)| {
            TaskBuilder::new(&format!("t{id}"))
                .updated_at(ts(secs))
                .pinned(pinned)
                .status(if complete {
                    TaskStatus::Complete
                } else {
                    TaskStatus::Pending
                })
                .build()
        },
    )
}
