//! Year > week > task storage.
//!
//! Every task lives in exactly one (year, week) bucket. Missing years and
//! weeks read as empty buckets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::calendar::WeekKey;
use crate::models::{Day, Task, TaskUpdate};

#[derive(Debug, Clone, Default)]
pub struct HierarchyStore {
    tasks_by_year: BTreeMap<i32, BTreeMap<u32, Vec<Task>>>,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw bucket for `week`, in insertion order.
    pub fn tasks_for_week(&self, week: WeekKey) -> &[Task] {
        self.tasks_by_year
            .get(&week.year)
            .and_then(|weeks| weeks.get(&week.week))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tasks of `week` scheduled on `day`, in display order.
    pub fn tasks_for_day(&self, week: WeekKey, day: Day) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks_for_week(week)
            .iter()
            .filter(|t| t.day == day)
            .cloned()
            .collect();
        sort_for_display(&mut tasks);
        tasks
    }

    /// Every task of every bucket, years and weeks ascending.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks_by_year
            .values()
            .flat_map(|weeks| weeks.values())
            .flatten()
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.all_tasks().find(|t| t.id == id)
    }

    /// Buckets that currently hold at least one task.
    pub fn weeks(&self) -> Vec<WeekKey> {
        self.tasks_by_year
            .iter()
            .flat_map(|(year, weeks)| {
                weeks
                    .iter()
                    .filter(|(_, tasks)| !tasks.is_empty())
                    .map(move |(week, _)| WeekKey::new(*year, *week))
            })
            .collect()
    }

    /// Adds `task` to its bucket. A task whose id is already present is
    /// replaced in place, since a snapshot echo may land before the write
    /// that caused it returns.
    pub fn insert(&mut self, task: Task) {
        if let Some(existing) = self.find_mut(&task.id) {
            debug!(id = %task.id, "replacing task already in store");
            *existing = task;
            return;
        }
        self.bucket_mut(task.week_key()).push(task);
    }

    /// Applies `update` to the task with `id`. Returns false (and logs) if no
    /// bucket holds it.
    pub fn apply_update(&mut self, id: &str, update: &TaskUpdate, now: DateTime<Utc>) -> bool {
        match self.find_mut(id) {
            Some(task) => {
                update.apply_to(task, now);
                true
            }
            None => {
                warn!(id, "update for task missing from store");
                false
            }
        }
    }

    /// Removes the task with `id`. Returns `None` (and logs) if no bucket
    /// holds it.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        for weeks in self.tasks_by_year.values_mut() {
            for tasks in weeks.values_mut() {
                if let Some(index) = tasks.iter().position(|t| t.id == id) {
                    return Some(tasks.remove(index));
                }
            }
        }
        warn!(id, "remove for task missing from store");
        None
    }

    /// Replaces the whole bucket with a snapshot.
    pub fn replace_week(&mut self, week: WeekKey, tasks: Vec<Task>) {
        *self.bucket_mut(week) = tasks;
    }

    fn bucket_mut(&mut self, week: WeekKey) -> &mut Vec<Task> {
        self.tasks_by_year
            .entry(week.year)
            .or_default()
            .entry(week.week)
            .or_default()
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks_by_year
            .values_mut()
            .flat_map(|weeks| weeks.values_mut())
            .flatten()
            .find(|t| t.id == id)
    }
}

/// Stable display order: incomplete first, then completed awaiting approval,
/// then approved. Ties keep their relative order.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| match (t.completed, t.approved) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    });
}
