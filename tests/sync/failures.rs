use crate::common::{fast_retry_config, Harness};
use std::time::Duration;
use task_sync::models::{NewTask, TaskId, TaskPatch};
use task_sync::mutation::{LocalChange, MutationKind, MutationKindTag};
use task_sync::query::TaskFilter;
use task_sync::remote::RemoteError;
use task_sync::test_helpers::{ts, TaskBuilder};
use task_sync::SyncError;
use tokio_test::{assert_err, assert_ok};

fn network() -> RemoteError {
    RemoteError::Network("connection reset".to_string())
}

#[tokio::test(start_paused = true)]
async fn test_transient_network_failure_is_retried() {
    let harness = Harness::with_config(
        fast_retry_config(),
        vec![TaskBuilder::new("t").updated_at(ts(0)).build()],
    )
    .await;
    harness.remote.fail_next(network());

    let task = assert_ok!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::TogglePinned)
            .await
    );
    assert!(task.pinned);
    assert_eq!(harness.remote.call_count("update"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_escalate_and_roll_back() {
    let harness = Harness::with_config(
        fast_retry_config(),
        vec![TaskBuilder::new("t").updated_at(ts(0)).build()],
    )
    .await;
    let before = harness.engine.snapshot();
    for _ in 0..3 {
        harness.remote.fail_next(network());
    }

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::ToggleStatus)
            .await
    );

    assert!(matches!(err, SyncError::ServerRejection { ref code, .. } if code == "network_exhausted"));
    assert!(err.is_user_facing());
    assert_eq!(harness.engine.snapshot(), before);
    assert_eq!(harness.remote.call_count("update_status"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_count_as_network_failures() {
    let harness = Harness::with_config(
        fast_retry_config(),
        vec![TaskBuilder::new("t").updated_at(ts(0)).build()],
    )
    .await;
    let before = harness.engine.snapshot();
    harness.remote.set_latency(Duration::from_secs(60));

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(
                Some(TaskId::new("t")),
                MutationKind::Update(TaskPatch::new().title("Slow")),
            )
            .await
    );

    assert!(matches!(err, SyncError::ServerRejection { ref code, .. } if code == "network_exhausted"));
    assert_eq!(harness.engine.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_creation_is_sent_once() {
    let harness = Harness::with_config(fast_retry_config(), vec![]).await;
    let before = harness.engine.snapshot();
    harness.remote.set_latency(Duration::from_millis(600));

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Book flights", "user-1")))
            .await
    );
    assert!(matches!(err, SyncError::ServerRejection { ref code, .. } if code == "network_exhausted"));
    assert_eq!(harness.engine.snapshot(), before);

    // The lost attempt still lands on the server, exactly once
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.remote.call_count("create"), 1);
    assert_eq!(harness.remote.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_creation_network_failure_is_not_retried() {
    let harness = Harness::with_config(fast_retry_config(), vec![]).await;
    harness.remote.fail_next(network());

    assert_err!(
        harness
            .engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Book flights", "user-1")))
            .await
    );
    assert_eq!(harness.remote.call_count("create"), 1);
    assert!(harness.remote.is_empty());
}

#[tokio::test]
async fn test_conflict_removes_entry_instead_of_restoring() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("gone").updated_at(ts(0)).build(),
        TaskBuilder::new("kept").updated_at(ts(0)).build(),
    ])
    .await;
    harness.remote.fail_next(RemoteError::NotFound(TaskId::new("gone")));

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("gone")), MutationKind::TogglePinned)
            .await
    );

    assert!(matches!(err, SyncError::Conflict { ref task_id } if task_id.as_str() == "gone"));
    assert!(harness.task("gone").is_none());
    assert!(harness.task("kept").is_some());
    assert_eq!(harness.total_count(), 1);

    // Stale echoes cannot bring it back
    harness
        .feed
        .update(&TaskBuilder::new("gone").updated_at(ts(50)).build());
    assert!(harness.task("gone").is_none());
}

#[tokio::test]
async fn test_failed_delete_restores_entry_and_count() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("a").updated_at(ts(0)).build(),
        TaskBuilder::new("b").updated_at(ts(0)).build(),
    ])
    .await;
    let before = harness.engine.snapshot();
    harness
        .remote
        .fail_next(RemoteError::rejected("permission_denied", "shared task"));

    assert_err!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("a")), MutationKind::Delete)
            .await
    );

    assert_eq!(harness.engine.snapshot(), before);
    assert_eq!(harness.total_count(), 2);
}

#[tokio::test]
async fn test_confirmed_delete_is_terminal() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("a").updated_at(ts(0)).build()]).await;

    let deleted = assert_ok!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("a")), MutationKind::Delete)
            .await
    );
    assert_eq!(deleted.id, TaskId::new("a"));
    assert!(harness.task("a").is_none());
    assert_eq!(harness.total_count(), 0);

    harness.feed.insert(&TaskBuilder::new("a").updated_at(ts(99)).build());
    assert!(harness.task("a").is_none());
}

#[tokio::test]
async fn test_failed_creation_leaves_no_trace() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("a").updated_at(ts(0)).build()]).await;
    let before = harness.engine.snapshot();
    harness
        .remote
        .fail_next(RemoteError::rejected("quota_exceeded", "too many tasks"));

    assert_err!(
        harness
            .engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("One more", "user-1")))
            .await
    );

    assert_eq!(harness.engine.snapshot(), before);
}

#[tokio::test]
async fn test_validation_rejects_before_dispatch() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("a").updated_at(ts(0)).build()]).await;
    let before = harness.engine.snapshot();

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("  ", "user-1")))
            .await
    );
    assert!(matches!(err, SyncError::Validation { ref field, .. } if field == "title"));

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(
                Some(TaskId::new("a")),
                MutationKind::Update(TaskPatch::new().url_link(Some("javascript:alert(1)".to_string()))),
            )
            .await
    );
    assert!(matches!(err, SyncError::Validation { ref field, .. } if field == "url_link"));

    assert_eq!(harness.engine.snapshot(), before);
    assert!(harness.remote.calls().iter().all(|call| *call == "list"));
}

#[tokio::test]
async fn test_page_load_during_pending_delete_keeps_rollback_exact() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("a").updated_at(ts(0)).build(),
        TaskBuilder::new("b").updated_at(ts(0)).build(),
    ])
    .await;
    let before = harness.engine.snapshot();
    let coordinator = harness.engine.coordinator();

    let token = assert_ok!(
        coordinator
            .begin(TaskId::new("a"), MutationKindTag::Delete, |_| Ok(LocalChange::Hide))
            .await
    );
    assert_eq!(harness.total_count(), 1);

    // The server still counts the row hidden here
    let loaded = assert_ok!(harness.engine.load_page(1, 50, TaskFilter::default()).await);
    assert_eq!(loaded.total_count, 1);
    assert_eq!(harness.total_count(), 1);

    coordinator.abort(token, SyncError::server_rejection("permission_denied", "shared task"));
    assert_eq!(harness.total_count(), 2);
    assert_eq!(harness.engine.snapshot(), before);
}
