//! Derived point totals.
//!
//! The ledger is never maintained incrementally as the source of truth:
//! [`Ledger::rebuild`] recomputes it from the task bucket and the approval
//! queue. [`Ledger::credit`] and [`Ledger::debit`] only exist to show a
//! provisional change before the next rebuild.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::WeekKey;
use crate::hierarchy::HierarchyStore;
use crate::models::{Day, Participant, PendingApproval, Task};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    totals: BTreeMap<Participant, u32>,
}

impl Ledger {
    /// A ledger with every roster member at zero.
    pub fn with_roster(roster: &[Participant]) -> Self {
        Ledger {
            totals: roster.iter().map(|p| (p.clone(), 0)).collect(),
        }
    }

    /// Week total per participant: approved tasks of `week_tasks` they
    /// completed, plus their entries in the approval queue.
    pub fn rebuild(
        roster: &[Participant],
        week_tasks: &[Task],
        pending: &[PendingApproval],
    ) -> Self {
        let mut ledger = Ledger::with_roster(roster);
        for task in week_tasks.iter().filter(|t| t.approved) {
            if let Some(by) = &task.completed_by {
                ledger.credit(by, task.points);
            }
        }
        for approval in pending {
            ledger.credit(&approval.child, approval.points);
        }
        ledger
    }

    pub fn credit(&mut self, participant: &Participant, points: u8) {
        *self.totals.entry(participant.clone()).or_insert(0) += u32::from(points);
    }

    pub fn debit(&mut self, participant: &Participant, points: u8) {
        if let Some(total) = self.totals.get_mut(participant) {
            *total = total.saturating_sub(u32::from(points));
        }
    }

    /// Zeroes every total, keeping the participants.
    pub fn reset(&mut self) {
        self.totals.values_mut().for_each(|t| *t = 0);
    }

    pub fn total(&self, participant: &Participant) -> u32 {
        self.totals.get(participant).copied().unwrap_or(0)
    }

    pub fn totals(&self) -> impl Iterator<Item = (&Participant, u32)> {
        self.totals.iter().map(|(p, t)| (p, *t))
    }

    pub fn sum(&self) -> u32 {
        self.totals.values().sum()
    }
}

/// Approved points per participant for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekPoints {
    pub week: WeekKey,
    pub ledger: Ledger,
}

/// Approved points of every non-empty bucket, most recent year first and
/// weeks ascending within a year.
pub fn points_by_week(store: &HierarchyStore, roster: &[Participant]) -> Vec<WeekPoints> {
    let mut weeks: Vec<WeekPoints> = store
        .weeks()
        .into_iter()
        .map(|week| WeekPoints {
            week,
            ledger: Ledger::rebuild(roster, store.tasks_for_week(week), &[]),
        })
        .collect();
    weeks.sort_by(|a, b| b.week.year.cmp(&a.week.year).then(a.week.week.cmp(&b.week.week)));
    weeks
}

/// Sum of all weeks in `history`.
pub fn overall_totals(history: &[WeekPoints], roster: &[Participant]) -> Ledger {
    let mut ledger = Ledger::with_roster(roster);
    for (participant, total) in history.iter().flat_map(|w| w.ledger.totals()) {
        *ledger.totals.entry(participant.clone()).or_insert(0) += total;
    }
    ledger
}

/// Approved points earned on `day` among `tasks`.
pub fn day_points(tasks: &[Task], day: Day) -> u32 {
    tasks
        .iter()
        .filter(|t| t.day == day && t.approved)
        .map(|t| u32::from(t.points))
        .sum()
}
