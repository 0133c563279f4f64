//! Projection of recurring templates onto a week.

use chrono::{DateTime, Utc};

use crate::calendar::WeekKey;
use crate::hierarchy::HierarchyStore;
use crate::models::{RecurringTask, Task, VIRTUAL_ID_PREFIX};

/// Synthetic id of the projection of `template_id` onto `week`.
pub fn virtual_id(template_id: &str, week: WeekKey) -> String {
    format!(
        "{}{}-{}-{}",
        VIRTUAL_ID_PREFIX, template_id, week.year, week.week
    )
}

/// Splits a synthetic id back into template id and week. Template ids may
/// themselves contain dashes, so the week is read from the end.
pub fn parse_virtual_id(id: &str) -> Option<(String, WeekKey)> {
    let rest = id.strip_prefix(VIRTUAL_ID_PREFIX)?;
    let mut parts = rest.rsplitn(3, '-');
    let week = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    let template_id = parts.next().filter(|t| !t.is_empty())?;
    Some((template_id.to_string(), WeekKey::new(year, week)))
}

/// True if `week`'s bucket already holds a task materialized from `template`.
pub fn is_materialized(store: &HierarchyStore, template: &RecurringTask, week: WeekKey) -> bool {
    store
        .tasks_for_week(week)
        .iter()
        .any(|t| t.recurring_task_id.as_deref() == Some(template.id.as_str()))
}

/// Virtual tasks for every template not yet materialized in `week`, in
/// template order. Suppression looks only at `recurring_task_id`; title,
/// points and day are not compared.
pub fn project(
    templates: &[RecurringTask],
    store: &HierarchyStore,
    week: WeekKey,
    now: DateTime<Utc>,
) -> Vec<Task> {
    templates
        .iter()
        .filter(|template| !is_materialized(store, template, week))
        .map(|template| Task {
            id: virtual_id(&template.id, week),
            title: template.title.clone(),
            points: template.points,
            day: template.day,
            year: week.year,
            week: week.week,
            completed: false,
            approved: false,
            completed_by: None,
            completed_at: None,
            approved_at: None,
            recurring_task_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        })
        .collect()
}

/// Whether `task` should be shown as recurring.
///
/// Materialized tasks carry their template id. Anything else counts as
/// recurring when title, points and day all equal some template's, which
/// also matches a manual task that happens to look the same.
pub fn is_recurring(task: &Task, templates: &[RecurringTask]) -> bool {
    if task.recurring_task_id.is_some() {
        return true;
    }
    templates
        .iter()
        .any(|r| r.title == task.title && r.points == task.points && r.day == task.day)
}
