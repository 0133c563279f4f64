use chrono::{NaiveDate, Utc};
use weekchores::calendar::WeekKey;
use weekchores::models::{Day, Participant, RecurringUpdate, TaskDraft, TaskState, TaskUpdate};
use weekchores::Error;

#[test]
fn test_week_key_follows_iso_weeks() {
    let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    assert_eq!(WeekKey::of(monday), WeekKey::new(2025, 10));
    assert_eq!(WeekKey::new(2025, 10).monday(), Some(monday));

    // 2024-12-30 belongs to ISO week 1 of 2025
    let boundary = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
    assert_eq!(WeekKey::of(boundary), WeekKey::new(2025, 1));
    assert_eq!(WeekKey::new(2025, 1).previous(), Some(WeekKey::new(2024, 52)));
    assert_eq!(WeekKey::new(2020, 53).next(), Some(WeekKey::new(2021, 1)));
    assert_eq!(WeekKey::new(2025, 53).monday(), None);
}

#[test]
fn test_week_key_parse_and_display() {
    let week: WeekKey = "2025-W07".parse().unwrap();
    assert_eq!(week, WeekKey::new(2025, 7));
    assert_eq!(week.to_string(), "2025-W07");
    assert_eq!("2025-7".parse::<WeekKey>().unwrap(), week);
    assert!("2025".parse::<WeekKey>().is_err());
    assert!("2025-W60".parse::<WeekKey>().is_err());
}

#[test]
fn test_day_names() {
    assert_eq!("lørdag".parse::<Day>().unwrap(), Day::Lordag);
    assert_eq!("Sondag".parse::<Day>().unwrap(), Day::Sondag);
    assert_eq!("monday".parse::<Day>().unwrap(), Day::Mandag);
    assert!(matches!("someday".parse::<Day>(), Err(Error::InvalidArgument(_))));
    assert_eq!(Day::Lordag.to_string(), "Lørdag");
    assert_eq!(serde_json::to_string(&Day::Sondag).unwrap(), "\"Søndag\"");
    assert_eq!(Day::ALL.len(), 7);
}

#[test]
fn test_participant_trims_and_rejects_blank() {
    assert_eq!(Participant::parse("  Noah ").unwrap().as_str(), "Noah");
    assert!(Participant::parse("   ").is_err());
}

#[test]
fn test_task_state_follows_flags() {
    let week = WeekKey::new(2025, 10);
    let now = Utc::now();
    let mut task = TaskDraft::open("Vacuum", 3, Day::Mandag, week)
        .unwrap()
        .into_task("abc".to_string(), now);
    assert_eq!(task.state(), TaskState::Open);

    TaskUpdate::completion(Participant::parse("Simon").unwrap(), now).apply_to(&mut task, now);
    assert_eq!(task.state(), TaskState::Pending);
    TaskUpdate::approval(now).apply_to(&mut task, now);
    assert_eq!(task.state(), TaskState::Approved);
    assert!(task.completed);

    TaskUpdate::reopen().apply_to(&mut task, now);
    assert_eq!(task.state(), TaskState::Open);
    assert!(task.completed_by.is_none() && task.approved_at.is_none());

    task.id = "recurring-tpl-2025-10".to_string();
    assert_eq!(task.state(), TaskState::Virtual);
}

#[test]
fn test_points_and_title_are_validated() {
    let week = WeekKey::new(2025, 10);
    assert!(TaskDraft::open("Vacuum", 1, Day::Mandag, week).is_ok());
    assert!(TaskDraft::open("Vacuum", 5, Day::Mandag, week).is_ok());
    assert!(TaskDraft::open("Vacuum", 0, Day::Mandag, week).is_err());
    assert!(TaskDraft::open("Vacuum", 6, Day::Mandag, week).is_err());
    assert!(TaskDraft::open("", 3, Day::Mandag, week).is_err());
    assert!(TaskUpdate::edit("Vacuum", 7).is_err());
    assert!(RecurringUpdate::new(None, Some(0), None).is_err());
    assert!(RecurringUpdate::new(None, None, None).unwrap().is_empty());
}

#[test]
fn test_exit_codes() {
    assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 2);
    assert_eq!(Error::not_found("task", "abc").exit_code(), 2);
    assert_eq!(
        Error::InvalidTransition {
            id: "abc".into(),
            state: "approved".into(),
            action: "edit"
        }
        .exit_code(),
        3
    );
    assert_eq!(Error::GatewayUnavailable.exit_code(), 4);
    assert_eq!(
        Error::not_found("task", "abc").to_string(),
        "task not found: abc"
    );
}
