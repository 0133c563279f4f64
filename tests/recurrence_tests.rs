use chrono::Utc;
use weekchores::calendar::WeekKey;
use weekchores::hierarchy::HierarchyStore;
use weekchores::models::{Day, RecurringTask, TaskDraft, TaskState};
use weekchores::recurrence::{is_recurring, parse_virtual_id, project, virtual_id};

fn template(id: &str, title: &str, points: u8, day: Day) -> RecurringTask {
    RecurringTask {
        id: id.to_string(),
        title: title.to_string(),
        points,
        day,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn test_virtual_id_round_trips_with_dashed_template_id() {
    let week = WeekKey::new(2025, 7);
    let id = virtual_id("tpl-with-dashes", week);
    assert_eq!(id, "recurring-tpl-with-dashes-2025-7");
    assert_eq!(
        parse_virtual_id(&id),
        Some(("tpl-with-dashes".to_string(), week))
    );
}

#[test]
fn test_parse_virtual_id_rejects_other_ids() {
    assert_eq!(parse_virtual_id("3f2a9c"), None);
    assert_eq!(parse_virtual_id("recurring-"), None);
    assert_eq!(parse_virtual_id("recurring-abc-2025-xx"), None);
    assert_eq!(parse_virtual_id("recurring--2025-10"), None);
}

#[test]
fn test_projects_every_unmaterialized_template() {
    let week = WeekKey::new(2025, 10);
    let templates = vec![
        template("t1", "Dishes", 1, Day::Tirsdag),
        template("t2", "Laundry", 3, Day::Lordag),
    ];
    let store = HierarchyStore::new();

    let projected = project(&templates, &store, week, Utc::now());
    assert_eq!(projected.len(), 2);
    assert_eq!(projected[0].id, virtual_id("t1", week));
    assert_eq!(projected[0].state(), TaskState::Virtual);
    assert_eq!(projected[0].day, Day::Tirsdag);
    assert_eq!(projected[1].points, 3);
    assert!(projected.iter().all(|t| t.week_key() == week));
}

#[test]
fn test_materialized_template_is_not_projected() {
    let week = WeekKey::new(2025, 10);
    let templates = vec![template("t1", "Dishes", 1, Day::Tirsdag)];
    let mut store = HierarchyStore::new();
    let mut draft = TaskDraft::open("Something else", 4, Day::Fredag, week).unwrap();
    draft.recurring_task_id = Some("t1".to_string());
    store.insert(draft.into_task("m1".to_string(), Utc::now()));

    assert!(project(&templates, &store, week, Utc::now()).is_empty());
    // Other weeks still get a projection
    assert_eq!(
        project(&templates, &store, WeekKey::new(2025, 11), Utc::now()).len(),
        1
    );
}

#[test]
fn test_lookalike_manual_task_does_not_suppress_projection() {
    let week = WeekKey::new(2025, 10);
    let templates = vec![template("t1", "Dishes", 1, Day::Tirsdag)];
    let mut store = HierarchyStore::new();
    let manual = TaskDraft::open("Dishes", 1, Day::Tirsdag, week)
        .unwrap()
        .into_task("m1".to_string(), Utc::now());
    store.insert(manual.clone());

    assert_eq!(project(&templates, &store, week, Utc::now()).len(), 1);
    // but it is still flagged as recurring in the views
    assert!(is_recurring(&manual, &templates));
}

#[test]
fn test_is_recurring_needs_all_fields_to_match() {
    let week = WeekKey::new(2025, 10);
    let templates = vec![template("t1", "Dishes", 1, Day::Tirsdag)];
    let other_day = TaskDraft::open("Dishes", 1, Day::Onsdag, week)
        .unwrap()
        .into_task("a".to_string(), Utc::now());
    let other_points = TaskDraft::open("Dishes", 2, Day::Tirsdag, week)
        .unwrap()
        .into_task("b".to_string(), Utc::now());

    assert!(!is_recurring(&other_day, &templates));
    assert!(!is_recurring(&other_points, &templates));
}
