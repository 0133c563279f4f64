//! In-process state shared by the workflow and the front ends.
//!
//! A `Board` is an ordinary owned value: build one per process (or per
//! test) and hand it to a [`Workflow`](crate::workflow::Workflow).

use chrono::Utc;
use tracing::debug;

use crate::calendar::WeekKey;
use crate::error::{Error, Result};
use crate::gateway::GatewayEvent;
use crate::hierarchy::{sort_for_display, HierarchyStore};
use crate::ledger::{self, Ledger, WeekPoints};
use crate::models::{Day, Participant, PendingApproval, RecurringTask, Task};
use crate::recurrence;

#[derive(Debug, Clone)]
pub struct Board {
    pub(crate) store: HierarchyStore,
    pub(crate) templates: Vec<RecurringTask>,
    pub(crate) pending: Vec<PendingApproval>,
    pub(crate) ledger: Ledger,
    roster: Vec<Participant>,
    week: WeekKey,
}

impl Board {
    pub fn new(roster: Vec<Participant>, week: WeekKey) -> Self {
        Board {
            store: HierarchyStore::new(),
            templates: Vec::new(),
            pending: Vec::new(),
            ledger: Ledger::with_roster(&roster),
            roster,
            week,
        }
    }

    /// The (year, week) bucket the day views and the ledger refer to.
    pub fn week(&self) -> WeekKey {
        self.week
    }

    pub(crate) fn set_week(&mut self, week: WeekKey) {
        self.week = week;
        self.recalculate_points();
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn store(&self) -> &HierarchyStore {
        &self.store
    }

    pub fn templates(&self) -> &[RecurringTask] {
        &self.templates
    }

    pub fn pending(&self) -> &[PendingApproval] {
        &self.pending
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Badge count for the approvals view.
    pub fn approvals_badge(&self) -> usize {
        self.pending.len()
    }

    /// Virtual tasks of the current week.
    pub fn projections(&self) -> Vec<Task> {
        recurrence::project(&self.templates, &self.store, self.week, Utc::now())
    }

    /// The current bucket followed by the current projections.
    pub fn week_tasks(&self) -> Vec<Task> {
        let mut tasks = self.store.tasks_for_week(self.week).to_vec();
        tasks.extend(self.projections());
        tasks
    }

    /// Tasks of the current week on `day`, projections included, in display
    /// order.
    pub fn tasks_for_day(&self, day: Day) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .week_tasks()
            .into_iter()
            .filter(|t| t.day == day)
            .collect();
        sort_for_display(&mut tasks);
        tasks
    }

    /// Looks in the store first, then among the current projections.
    pub fn find_task(&self, id: &str) -> Option<Task> {
        self.store
            .find(id)
            .cloned()
            .or_else(|| self.projections().into_iter().find(|t| t.id == id))
    }

    pub fn find_approval(&self, id: &str) -> Option<&PendingApproval> {
        self.pending.iter().find(|a| a.id == id)
    }

    pub fn find_template(&self, id: &str) -> Option<&RecurringTask> {
        self.templates.iter().find(|r| r.id == id)
    }

    pub fn is_recurring(&self, task: &Task) -> bool {
        recurrence::is_recurring(task, &self.templates)
    }

    /// Approved points of `day` in the current week.
    pub fn day_points(&self, day: Day) -> u32 {
        ledger::day_points(self.store.tasks_for_week(self.week), day)
    }

    pub fn points_history(&self) -> Vec<WeekPoints> {
        ledger::points_by_week(&self.store, &self.roster)
    }

    pub fn overall_points(&self) -> Ledger {
        ledger::overall_totals(&self.points_history(), &self.roster)
    }

    /// Rebuilds the ledger from the current bucket and the approval queue.
    pub fn recalculate_points(&mut self) {
        self.ledger = Ledger::rebuild(
            &self.roster,
            self.store.tasks_for_week(self.week),
            &self.pending,
        );
    }

    /// Folds a gateway snapshot in, then rebuilds the ledger.
    pub fn apply_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Tasks { week, tasks } => {
                debug!(%week, count = tasks.len(), "task snapshot");
                self.store.replace_week(week, tasks);
            }
            GatewayEvent::RecurringTasks(templates) => {
                debug!(count = templates.len(), "recurring snapshot");
                self.templates = templates;
            }
            GatewayEvent::PendingApprovals(pending) => {
                debug!(count = pending.len(), "approval snapshot");
                self.pending = pending;
            }
        }
        self.recalculate_points();
    }

    /// Resolves a full id or unique id prefix among the store and the
    /// current projections.
    pub fn resolve_task_id(&self, prefix: &str) -> Result<String> {
        let projections = self.projections();
        let ids = self
            .store
            .all_tasks()
            .chain(projections.iter())
            .map(|t| t.id.as_str());
        resolve("task", prefix, ids)
    }

    pub fn resolve_approval_id(&self, prefix: &str) -> Result<String> {
        resolve("pending approval", prefix, self.pending.iter().map(|a| a.id.as_str()))
    }

    pub fn resolve_template_id(&self, prefix: &str) -> Result<String> {
        resolve("recurring task", prefix, self.templates.iter().map(|r| r.id.as_str()))
    }
}

fn resolve<'a>(
    kind: &'static str,
    prefix: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<String> {
    let prefix = prefix.trim();
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(prefix)).collect();
    if matches.contains(&prefix) {
        return Ok(prefix.to_string());
    }
    match matches.as_slice() {
        [] => Err(Error::not_found(kind, prefix)),
        [only] => Ok(only.to_string()),
        _ => Err(Error::InvalidArgument(format!(
            "{} id '{}' is ambiguous ({} matches)",
            kind,
            prefix,
            matches.len()
        ))),
    }
}
