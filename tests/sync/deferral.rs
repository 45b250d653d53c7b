use crate::common::Harness;
use task_sync::models::{TaskId, TaskPatch};
use task_sync::mutation::MutationKind;
use task_sync::remote::RemoteError;
use task_sync::test_helpers::{eventually, ts, TaskBuilder};
use tokio_test::{assert_err, assert_ok};

fn pending_mutation(harness: &Harness, id: &str) -> bool {
    harness
        .engine
        .cache()
        .read(|cache| cache.pending_mutation(&TaskId::new(id)).is_some())
}

#[tokio::test]
async fn test_newer_realtime_update_applies_after_commit() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::TogglePinned)
            .await
    });
    eventually(|| harness.remote.waiting() == 1).await;
    assert!(pending_mutation(&harness, "t"));

    // Another client renamed the task far in the future
    let remote_edit = TaskBuilder::new("t")
        .title("Renamed elsewhere")
        .updated_at(ts(100_000))
        .build();
    harness.feed.update(&remote_edit);

    // Held back, not applied and not dropped
    let during = harness.task("t").unwrap();
    assert_eq!(during.title, "Task t");
    assert!(during.pinned);
    let deferred = harness
        .engine
        .cache()
        .read(|cache| cache.entry(&TaskId::new("t")).and_then(|entry| entry.deferred().cloned()));
    assert_eq!(deferred.map(|candidate| candidate.task), Some(remote_edit.clone()));

    harness.remote.release_all();
    assert_ok!(pending.await.unwrap());

    let settled = harness.task("t").unwrap();
    assert_eq!(settled, remote_edit);
    assert!(!pending_mutation(&harness, "t"));
}

#[tokio::test]
async fn test_older_realtime_update_is_dropped_after_commit() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(
                Some(TaskId::new("t")),
                MutationKind::Update(TaskPatch::new().title("Mine")),
            )
            .await
    });
    eventually(|| harness.remote.waiting() == 1).await;

    // Older than anything the server will confirm with
    harness
        .feed
        .update(&TaskBuilder::new("t").title("Old echo").updated_at(ts(1)).build());

    harness.remote.release_all();
    let confirmed = assert_ok!(pending.await.unwrap());

    let settled = harness.task("t").unwrap();
    assert_eq!(settled.title, "Mine");
    assert_eq!(settled, confirmed);
    assert_eq!(harness.engine.cache().read(|cache| cache.stats().rejected_stale), 1);
}

#[tokio::test]
async fn test_deferred_update_reapplies_after_rollback() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();
    harness
        .remote
        .fail_next(RemoteError::rejected("permission_denied", "nope"));

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::ToggleStatus)
            .await
    });
    eventually(|| harness.remote.waiting() == 1).await;

    let newer = TaskBuilder::new("t")
        .title("Edited elsewhere")
        .updated_at(ts(5))
        .build();
    harness.feed.update(&newer);

    harness.remote.release_all();
    assert_err!(pending.await.unwrap());

    // Rolled back to t0, then the held update was still newer
    assert_eq!(harness.task("t").unwrap(), newer);
}

#[tokio::test]
async fn test_only_latest_deferred_candidate_survives() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::TogglePinned)
            .await
    });
    eventually(|| harness.remote.waiting() == 1).await;

    for (secs, title) in [(100_000, "first"), (100_001, "second"), (100_002, "third")] {
        harness
            .feed
            .update(&TaskBuilder::new("t").title(title).updated_at(ts(secs)).build());
    }
    assert_eq!(
        harness.engine.cache().read(|cache| cache.stats().deferred_replaced),
        2
    );

    harness.remote.release_all();
    assert_ok!(pending.await.unwrap());
    assert_eq!(harness.task("t").unwrap().title, "third");
}

#[tokio::test]
async fn test_realtime_delete_during_mutation_wins() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(Some(TaskId::new("t")), MutationKind::TogglePinned)
            .await
    });
    eventually(|| harness.remote.waiting() == 1).await;

    harness.feed.delete(&TaskId::new("t"));
    assert!(harness.task("t").is_none());

    harness.remote.release_all();
    // The server still had the row, so the call itself succeeds
    assert_ok!(pending.await.unwrap());
    assert!(harness.task("t").is_none());
    assert_eq!(harness.total_count(), 0);
}
