use chrono::Utc;
use weekchores::calendar::WeekKey;
use weekchores::hierarchy::HierarchyStore;
use weekchores::ledger::{day_points, overall_totals, points_by_week, Ledger};
use weekchores::models::{ApprovalDraft, Day, Participant, Task, TaskDraft};

fn p(name: &str) -> Participant {
    Participant::parse(name).unwrap()
}

fn roster() -> Vec<Participant> {
    vec![p("Simon"), p("Noah")]
}

fn done(id: &str, points: u8, day: Day, week: WeekKey, by: &str, approved: bool) -> Task {
    let mut draft = TaskDraft::open(id, points, day, week).unwrap();
    draft.completed_by = Some(p(by));
    draft.completed_at = Some(Utc::now());
    let mut task = draft.into_task(id.to_string(), Utc::now());
    task.approved = approved;
    task
}

#[test]
fn test_new_ledger_lists_roster_at_zero() {
    let ledger = Ledger::with_roster(&roster());
    assert_eq!(ledger.totals().count(), 2);
    assert_eq!(ledger.sum(), 0);
    assert_eq!(ledger.total(&p("Ukjent")), 0);
}

#[test]
fn test_rebuild_counts_approved_tasks_and_queue() {
    let week = WeekKey::new(2025, 10);
    let approved = done("a", 3, Day::Mandag, week, "Simon", true);
    let waiting = done("b", 2, Day::Mandag, week, "Noah", false);
    let open = TaskDraft::open("c", 5, Day::Mandag, week)
        .unwrap()
        .into_task("c".to_string(), Utc::now());
    let queue = vec![ApprovalDraft::for_task(&waiting, p("Noah"), Utc::now())
        .into_approval("q1".to_string(), Utc::now())];

    let ledger = Ledger::rebuild(&roster(), &[approved, waiting, open], &queue);
    assert_eq!(ledger.total(&p("Simon")), 3);
    // Counted once, through the queue
    assert_eq!(ledger.total(&p("Noah")), 2);
    assert_eq!(ledger.sum(), 5);
}

#[test]
fn test_credit_debit_and_reset() {
    let mut ledger = Ledger::with_roster(&roster());
    ledger.credit(&p("Simon"), 4);
    ledger.debit(&p("Simon"), 1);
    ledger.debit(&p("Noah"), 3);
    assert_eq!(ledger.total(&p("Simon")), 3);
    assert_eq!(ledger.total(&p("Noah")), 0);

    ledger.reset();
    assert_eq!(ledger.sum(), 0);
    assert_eq!(ledger.totals().count(), 2);
}

#[test]
fn test_points_by_week_orders_recent_year_first() {
    let mut store = HierarchyStore::new();
    let w52 = WeekKey::new(2024, 52);
    let w2 = WeekKey::new(2025, 2);
    let w1 = WeekKey::new(2025, 1);
    store.insert(done("a", 3, Day::Mandag, w52, "Simon", true));
    store.insert(done("b", 2, Day::Fredag, w2, "Noah", true));
    store.insert(done("c", 4, Day::Fredag, w1, "Simon", true));
    store.insert(done("d", 5, Day::Fredag, w1, "Noah", false));

    let history = points_by_week(&store, &roster());
    let weeks: Vec<WeekKey> = history.iter().map(|w| w.week).collect();
    assert_eq!(weeks, vec![w1, w2, w52]);
    assert_eq!(history[0].ledger.total(&p("Simon")), 4);
    assert_eq!(history[0].ledger.total(&p("Noah")), 0);

    let overall = overall_totals(&history, &roster());
    assert_eq!(overall.total(&p("Simon")), 7);
    assert_eq!(overall.total(&p("Noah")), 2);
}

#[test]
fn test_day_points_only_counts_approved() {
    let week = WeekKey::new(2025, 10);
    let tasks = vec![
        done("a", 3, Day::Mandag, week, "Simon", true),
        done("b", 2, Day::Mandag, week, "Noah", false),
        done("c", 4, Day::Tirsdag, week, "Noah", true),
    ];
    assert_eq!(day_points(&tasks, Day::Mandag), 3);
    assert_eq!(day_points(&tasks, Day::Tirsdag), 4);
    assert_eq!(day_points(&tasks, Day::Sondag), 0);
}
