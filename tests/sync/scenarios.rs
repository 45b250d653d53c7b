use crate::common::Harness;
use task_sync::models::{NewTask, TaskId, TaskStatus};
use task_sync::mutation::MutationKind;
use task_sync::query::{StatusBucket, TaskFilter};
use task_sync::remote::RemoteError;
use task_sync::test_helpers::{ts, TaskBuilder};
use task_sync::SyncError;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_toggle_complete_confirms_with_server_timestamp() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("x").updated_at(ts(0)).build()]).await;

    let task = assert_ok!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("x")), MutationKind::ToggleStatus)
            .await
    );

    let cached = harness.task("x").unwrap();
    assert_eq!(cached.status, TaskStatus::Complete);
    assert_eq!(cached.updated_at, task.updated_at);
    assert!(cached.updated_at > ts(0));
}

#[tokio::test]
async fn test_permission_denied_reverts_exactly() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("x").updated_at(ts(0)).build()]).await;
    let before = harness.engine.snapshot();
    harness
        .remote
        .fail_next(RemoteError::rejected("permission_denied", "not the owner"));

    let err = assert_err!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("x")), MutationKind::ToggleStatus)
            .await
    );

    assert!(matches!(err, SyncError::ServerRejection { ref code, .. } if code == "permission_denied"));
    let cached = harness.task("x").unwrap();
    assert_eq!(cached.status, TaskStatus::Pending);
    assert_eq!(cached.updated_at, ts(0));
    assert_eq!(harness.engine.snapshot(), before);
}

#[tokio::test]
async fn test_realtime_delete_blocks_stale_fetch() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("y").updated_at(ts(1)).build(),
        TaskBuilder::new("z").updated_at(ts(1)).build(),
    ])
    .await;
    assert_eq!(harness.total_count(), 2);

    // A page request issued before the delete
    harness.remote.hold();
    let engine = harness.engine.clone();
    let stale_fetch =
        tokio::spawn(async move { engine.load_page(1, 50, TaskFilter::default()).await });
    task_sync::test_helpers::eventually(|| harness.remote.waiting() == 1).await;

    harness.feed.delete(&TaskId::new("y"));
    assert!(harness.task("y").is_none());
    assert_eq!(harness.total_count(), 1);

    harness.remote.release_all();
    assert_ok!(stale_fetch.await.unwrap());
    assert!(harness.task("y").is_none());
    assert!(!harness.engine.snapshot().contains(&TaskId::new("y")));
}

#[tokio::test]
async fn test_creation_ends_with_exactly_one_entry() {
    let harness = Harness::with_tasks(vec![]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Pay rent", "user-1")))
            .await
    });
    task_sync::test_helpers::eventually(|| harness.remote.waiting() == 1).await;

    let optimistic = harness.engine.get_snapshot();
    assert_eq!(optimistic.len(), 1);
    assert!(optimistic[0].id.is_temporary());

    harness.remote.release_all();
    let created = assert_ok!(pending.await.unwrap());

    let settled = harness.engine.get_snapshot();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].id, created.id);
    assert!(!created.id.is_temporary());
    assert_eq!(harness.total_count(), 1);
}

#[tokio::test]
async fn test_creation_echo_before_commit_is_never_shown_twice() {
    let harness = Harness::with_tasks(vec![]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Pay rent", "user-1")))
            .await
    });
    task_sync::test_helpers::eventually(|| harness.remote.waiting() == 1).await;

    // The server row's insert event overtakes the create response
    let echo = TaskBuilder::new("srv-1")
        .title("Pay rent")
        .updated_at(ts(5_000))
        .build();
    harness.feed.insert(&echo);

    let during = harness.engine.get_snapshot();
    assert_eq!(during.len(), 1);
    assert!(during[0].id.is_temporary());
    assert_eq!(harness.total_count(), 1);

    harness.remote.release_all();
    let created = assert_ok!(pending.await.unwrap());
    assert_eq!(created.id, TaskId::new("srv-1"));

    // The held echo is newer than the confirmation, so it wins
    assert_eq!(harness.engine.get_snapshot(), vec![echo]);
    assert_eq!(harness.total_count(), 1);
}

#[tokio::test]
async fn test_foreign_insert_during_creation_appears_once_settled() {
    let harness = Harness::with_tasks(vec![]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Mine", "user-1")))
            .await
    });
    task_sync::test_helpers::eventually(|| harness.remote.waiting() == 1).await;

    harness
        .feed
        .insert(&TaskBuilder::new("other").updated_at(ts(1)).build());
    assert!(harness.task("other").is_none());

    harness.remote.release_all();
    assert_ok!(pending.await.unwrap());
    assert!(harness.task("other").is_some());
    assert_eq!(harness.engine.get_snapshot().len(), 2);
    assert_eq!(harness.total_count(), 2);
}

#[tokio::test]
async fn test_creation_echo_after_commit_is_merged() {
    let harness = Harness::with_tasks(vec![]).await;
    harness.remote.hold();

    let engine = harness.engine.clone();
    let pending = tokio::spawn(async move {
        engine
            .issue_mutation(None, MutationKind::Create(NewTask::new("Pay rent", "user-1")))
            .await
    });
    task_sync::test_helpers::eventually(|| harness.remote.waiting() == 1).await;
    harness.remote.release_all();
    let created = assert_ok!(pending.await.unwrap());

    // Echo of our own insert arrives after the commit
    harness.feed.insert(&created);
    assert_eq!(harness.engine.get_snapshot().len(), 1);
    assert_eq!(harness.total_count(), 1);
}

#[tokio::test]
async fn test_complete_filter_sees_toggled_task() {
    let harness = Harness::with_tasks(vec![
        TaskBuilder::new("a").updated_at(ts(1)).build(),
        TaskBuilder::new("b").updated_at(ts(1)).build(),
    ])
    .await;

    assert_ok!(
        harness
            .engine
            .issue_mutation(Some(TaskId::new("b")), MutationKind::ToggleStatus)
            .await
    );

    let complete = harness
        .engine
        .view(&TaskFilter::from(StatusBucket::Complete), 1, 20);
    assert_eq!(complete.len(), 1);
    assert_eq!(complete[0].id, TaskId::new("b"));
}

#[tokio::test]
async fn test_follow_up_creates_new_entity() {
    let harness = Harness::with_tasks(vec![TaskBuilder::new("p").updated_at(ts(1)).build()]).await;
    let parent_before = harness.task("p").unwrap();

    let child = assert_ok!(
        harness
            .engine
            .issue_mutation(
                Some(TaskId::new("p")),
                MutationKind::CreateFollowUp(NewTask::new("Follow up", "user-1")),
            )
            .await
    );

    assert_eq!(child.parent_task_id, Some(TaskId::new("p")));
    assert_eq!(harness.task("p").unwrap(), parent_before);
    let follow_ups = harness
        .engine
        .view(&TaskFilter::default().follow_ups_of("p"), 1, 20);
    assert_eq!(follow_ups.len(), 1);
    assert_eq!(harness.total_count(), 2);
}
