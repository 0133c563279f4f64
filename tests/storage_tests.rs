use std::fs;

use chrono::Utc;
use tempfile::tempdir;
use weekchores::calendar::WeekKey;
use weekchores::gateway::{event_channel, GatewayEvent, PersistenceGateway};
use weekchores::ledger::Ledger;
use weekchores::models::{
    ApprovalDraft, Day, Participant, RecurringDraft, RecurringUpdate, TaskDraft, TaskUpdate,
};
use weekchores::storage::LocalGateway;
use weekchores::Error;

fn week() -> WeekKey {
    WeekKey::new(2025, 10)
}

fn simon() -> Participant {
    Participant::parse("Simon").unwrap()
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let (task_id, template_id) = {
        let gw = LocalGateway::open(dir.path()).unwrap();
        gw.test_connection().await.unwrap();
        let task = gw
            .create_task(TaskDraft::open("Vacuum", 3, Day::Mandag, week()).unwrap())
            .await
            .unwrap();
        gw.update_task(&task.id, &TaskUpdate::completion(simon(), Utc::now()))
            .await
            .unwrap();
        gw.create_pending_approval(ApprovalDraft::for_task(&task, simon(), Utc::now()))
            .await
            .unwrap();
        let template = gw
            .create_recurring_task(RecurringDraft::new("Dishes", 1, Day::Lordag).unwrap())
            .await
            .unwrap();
        gw.record_reset(week()).await.unwrap();
        (task.id, template.id)
    };

    let gw = LocalGateway::open(dir.path()).unwrap();
    let tasks = gw.tasks_for_week(week()).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert!(tasks[0].completed);
    assert_eq!(tasks[0].completed_by, Some(simon()));
    let templates = gw.list_recurring_tasks().await.unwrap();
    assert_eq!(templates[0].id, template_id);
    assert_eq!(templates[0].day, Day::Lordag);
    assert_eq!(gw.last_reset().await.unwrap(), Some(week()));
}

#[tokio::test]
async fn test_files_use_camel_case_and_norwegian_days() {
    let dir = tempdir().unwrap();
    let gw = LocalGateway::open(dir.path()).unwrap();
    let mut draft = TaskDraft::open("Laundry", 2, Day::Sondag, week()).unwrap();
    draft.recurring_task_id = Some("tpl".to_string());
    gw.create_task(draft).await.unwrap();

    let raw = fs::read_to_string(dir.path().join("tasks.json")).unwrap();
    assert!(raw.contains("\"recurringTaskId\": \"tpl\""));
    assert!(raw.contains("\"day\": \"Søndag\""));
    assert!(raw.contains("\"week\": 10"));
}

#[tokio::test]
async fn test_empty_file_reads_as_empty_collection() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("tasks.json"), "").unwrap();
    let gw = LocalGateway::open(dir.path()).unwrap();
    assert!(gw.tasks_for_week(week()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_fails_to_open() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("approvals.json"), "{ not json").unwrap();
    let err = LocalGateway::open(dir.path()).err().expect("open should fail");
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_missing_ids_report_false() {
    let gw = LocalGateway::in_memory();
    assert!(!gw.update_task("nope", &TaskUpdate::reopen()).await.unwrap());
    assert!(!gw.delete_task("nope").await.unwrap());
    assert!(!gw.delete_pending_approval("nope").await.unwrap());
    assert!(!gw.delete_recurring_task("nope").await.unwrap());
    let update = RecurringUpdate::new(Some("x"), None, None).unwrap();
    assert!(!gw.update_recurring_task("nope", &update).await.unwrap());
}

#[tokio::test]
async fn test_subscribe_pushes_snapshot_then_changes() {
    let gw = LocalGateway::in_memory();
    let (tx, mut rx) = event_channel();
    gw.subscribe(week(), tx.clone()).await.unwrap();
    gw.subscribe_pending_approvals(tx).await.unwrap();

    assert_eq!(
        rx.try_recv().unwrap(),
        GatewayEvent::Tasks {
            week: week(),
            tasks: vec![]
        }
    );
    assert_eq!(rx.try_recv().unwrap(), GatewayEvent::PendingApprovals(vec![]));

    // Other weeks are not delivered
    gw.create_task(TaskDraft::open("Dust", 1, Day::Mandag, WeekKey::new(2025, 11)).unwrap())
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());

    let task = gw
        .create_task(TaskDraft::open("Vacuum", 3, Day::Mandag, week()).unwrap())
        .await
        .unwrap();
    match rx.try_recv().unwrap() {
        GatewayEvent::Tasks { week: w, tasks } => {
            assert_eq!(w, week());
            assert_eq!(tasks, vec![task.clone()]);
        }
        other => panic!("unexpected event {:?}", other),
    }

    gw.create_pending_approval(ApprovalDraft::for_task(&task, simon(), Utc::now()))
        .await
        .unwrap();
    match rx.try_recv().unwrap() {
        GatewayEvent::PendingApprovals(queue) => assert_eq!(queue[0].task_id, task.id),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_resubscribing_same_sink_keeps_one_subscription() {
    let gw = LocalGateway::in_memory();
    let (tx, mut rx) = event_channel();
    for _ in 0..3 {
        gw.subscribe(week(), tx.clone()).await.unwrap();
    }
    let (other_tx, mut other_rx) = event_channel();
    gw.subscribe(week(), other_tx).await.unwrap();
    while rx.try_recv().is_ok() {}
    while other_rx.try_recv().is_ok() {}

    gw.create_task(TaskDraft::open("Vacuum", 3, Day::Mandag, week()).unwrap())
        .await
        .unwrap();
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
    assert!(other_rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_dropped_subscribers_are_pruned() {
    let gw = LocalGateway::in_memory();
    let (tx, rx) = event_channel();
    gw.subscribe_recurring_tasks(tx).await.unwrap();
    drop(rx);

    gw.create_recurring_task(RecurringDraft::new("Dishes", 1, Day::Mandag).unwrap())
        .await
        .unwrap();
    assert_eq!(gw.list_recurring_tasks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_points_snapshot_is_mirrored() {
    let dir = tempdir().unwrap();
    let gw = LocalGateway::open(dir.path()).unwrap();
    assert!(gw.points_snapshot().unwrap().is_none());

    let mut ledger = Ledger::with_roster(&[simon()]);
    ledger.credit(&simon(), 4);
    assert!(gw.update_points_snapshot(&ledger).await.unwrap());

    let reopened = LocalGateway::open(dir.path()).unwrap();
    assert_eq!(reopened.points_snapshot().unwrap(), Some(ledger));
}

#[tokio::test]
async fn test_unwritable_dir_fails_connection_test() {
    let dir = tempdir().unwrap();
    let gw = LocalGateway::open(dir.path()).unwrap();
    gw.test_connection().await.unwrap();
    fs::remove_dir_all(dir.path()).unwrap();

    let err = gw.test_connection().await.unwrap_err();
    assert!(matches!(err, Error::GatewayUnavailable));
    let err = gw
        .create_task(TaskDraft::open("Vacuum", 3, Day::Mandag, week()).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Write(_)));
    assert!(gw.tasks_for_week(week()).await.unwrap().is_empty());
}
