use crate::common::Harness;
use futures::future::join_all;
use task_sync::models::{TaskId, TaskStatus};
use task_sync::mutation::MutationKind;
use task_sync::test_helpers::{eventually, ts, TaskBuilder};
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

fn spawn_mutation(
    harness: &Harness,
    id: &str,
    kind: MutationKind,
) -> JoinHandle<task_sync::SyncResult<task_sync::Task>> {
    let engine = harness.engine.clone();
    let id = TaskId::new(id);
    tokio::spawn(async move { engine.issue_mutation(Some(id), kind).await })
}

#[tokio::test]
async fn test_rapid_pin_toggles_never_lose_an_update() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let first = spawn_mutation(&harness, "t", MutationKind::TogglePinned);
    eventually(|| harness.remote.waiting() == 1).await;
    let second = spawn_mutation(&harness, "t", MutationKind::TogglePinned);
    eventually(|| harness.engine.coordinator().lanes().queued(&TaskId::new("t")) == 1).await;

    // The queued toggle has not run its transform yet
    assert!(harness.task("t").unwrap().pinned);

    harness.remote.release_all();
    assert_ok!(first.await.unwrap());
    assert_ok!(second.await.unwrap());

    // true XOR true
    assert!(!harness.task("t").unwrap().pinned);
    assert!(!harness.remote.get(&TaskId::new("t")).unwrap().pinned);
}

#[tokio::test]
async fn test_queue_of_any_depth_is_fifo() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let mut handles = vec![spawn_mutation(&harness, "t", MutationKind::TogglePinned)];
    eventually(|| harness.remote.waiting() == 1).await;
    for depth in 1..5 {
        handles.push(spawn_mutation(&harness, "t", MutationKind::TogglePinned));
        eventually(|| harness.engine.coordinator().lanes().queued(&TaskId::new("t")) == depth).await;
    }

    harness.remote.release_all();
    let pinned: Vec<bool> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| assert_ok!(joined.unwrap()).pinned)
        .collect();

    assert_eq!(pinned, vec![true, false, true, false, true]);
    assert!(harness.task("t").unwrap().pinned);
}

#[tokio::test]
async fn test_different_ids_proceed_independently() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("a").updated_at(ts(0)).build(),
        TaskBuilder::new("b").updated_at(ts(0)).build(),
    ])
    .await;
    harness.remote.hold();

    let a = spawn_mutation(&harness, "a", MutationKind::ToggleStatus);
    let b = spawn_mutation(&harness, "b", MutationKind::TogglePinned);
    eventually(|| harness.remote.waiting() == 2).await;

    // Both optimistic writes are visible at once
    assert_eq!(harness.task("a").unwrap().status, TaskStatus::Complete);
    assert!(harness.task("b").unwrap().pinned);

    harness.remote.release_all();
    assert_ok!(a.await.unwrap());
    assert_ok!(b.await.unwrap());
}

#[tokio::test]
async fn test_mutation_queued_behind_delete_reports_conflict() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("t").updated_at(ts(0)).build()]).await;
    harness.remote.hold();

    let delete = spawn_mutation(&harness, "t", MutationKind::Delete);
    eventually(|| harness.remote.waiting() == 1).await;
    let toggle = spawn_mutation(&harness, "t", MutationKind::ToggleStatus);
    eventually(|| harness.engine.coordinator().lanes().queued(&TaskId::new("t")) == 1).await;

    harness.remote.release_all();
    assert_ok!(delete.await.unwrap());
    let err = toggle.await.unwrap().unwrap_err();
    assert!(matches!(err, task_sync::SyncError::Conflict { ref task_id } if task_id.as_str() == "t"));
    assert!(err.is_user_facing());
    assert_eq!(harness.total_count(), 0);
}
