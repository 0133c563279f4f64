//! Completion and approval workflow.
//!
//! ```text
//! VIRTUAL --complete--> PENDING   (materialized as a new task)
//! OPEN    --complete--> PENDING
//! PENDING --approve---> APPROVED
//! PENDING --reject----> OPEN
//! OPEN    --edit------> OPEN
//! OPEN    --delete----> (removed)
//! ```
//!
//! Every mutation is written through the gateway first; the board changes
//! only after the gateway confirms. Gateway snapshots queued on the event
//! channel are folded in by [`Workflow::pump_events`], in arrival order.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::board::Board;
use crate::calendar::WeekKey;
use crate::error::{Error, Result};
use crate::gateway::{event_channel, EventReceiver, EventSender, PersistenceGateway};
use crate::models::{
    ApprovalDraft, Day, Participant, PendingApproval, RecurringDraft, RecurringTask,
    RecurringUpdate, Task, TaskDraft, TaskState, TaskUpdate,
};
use crate::recurrence;

/// Emitted when a task is approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebration {
    pub participant: Participant,
    pub points: u8,
    pub title: String,
}

/// What a weekly reset touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub week: Option<WeekKey>,
    pub reopened: usize,
    pub cleared_approvals: usize,
    pub materialized: usize,
}

pub struct Workflow<G: PersistenceGateway> {
    gateway: Arc<G>,
    board: Board,
    events: EventSender,
    inbox: EventReceiver,
    /// Weeks whose bucket snapshots already arrive on `events`.
    subscribed: HashSet<WeekKey>,
    connected: bool,
}

impl<G: PersistenceGateway> Workflow<G> {
    pub fn new(gateway: Arc<G>, board: Board) -> Self {
        let (events, inbox) = event_channel();
        Workflow {
            gateway,
            board,
            events,
            inbox,
            subscribed: HashSet::new(),
            connected: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Probes the gateway and subscribes to the current bucket, the
    /// templates and the approval queue. Until this succeeds every mutating
    /// operation fails with `GatewayUnavailable`.
    pub async fn connect(&mut self) -> Result<()> {
        self.gateway
            .test_connection()
            .await
            .inspect_err(|e| error!(error = %e, "gateway connection test failed"))?;
        let week = self.board.week();
        self.subscribe_week(week).await?;
        self.gateway
            .subscribe_recurring_tasks(self.events.clone())
            .await?;
        self.gateway
            .subscribe_pending_approvals(self.events.clone())
            .await?;
        self.connected = true;
        let applied = self.pump_events();
        info!(%week, snapshots = applied, "connected to gateway");
        Ok(())
    }

    /// Applies every queued gateway snapshot, in arrival order, rebuilding
    /// the ledger after each. Returns how many were applied.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.board.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Waits for the next snapshot and applies it. Returns false once the
    /// channel can no longer deliver.
    pub async fn next_event(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(event) => {
                self.board.apply_event(event);
                true
            }
            None => false,
        }
    }

    /// Authoritative ledger rebuild.
    pub fn recalculate_points(&mut self) {
        self.board.recalculate_points();
    }

    /// Reads past buckets (previous, current and next year) for the points
    /// history. Returns how many non-empty buckets were loaded.
    pub async fn load_history(&mut self) -> Result<usize> {
        self.ensure_connected()?;
        let current = self.board.week();
        let mut loaded = 0;
        for year in current.year - 1..=current.year + 1 {
            for week in 1..=53 {
                let key = WeekKey::new(year, week);
                if key == current || key.monday().is_none() {
                    continue;
                }
                match self.gateway.tasks_for_week(key).await {
                    Ok(tasks) if !tasks.is_empty() => {
                        self.board.store.replace_week(key, tasks);
                        loaded += 1;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(week = %key, error = %e, "skipping week in history"),
                }
            }
        }
        self.board.recalculate_points();
        info!(weeks = loaded, "loaded points history");
        Ok(loaded)
    }

    /// Moves the day views and the ledger to `week`.
    pub async fn change_week(&mut self, week: WeekKey) -> Result<()> {
        self.ensure_connected()?;
        if week == self.board.week() {
            return Ok(());
        }
        self.subscribe_week(week).await?;
        self.board.set_week(week);
        self.pump_events();
        info!(%week, "switched week");
        Ok(())
    }

    /// Creates an open task for `day` of the current week.
    pub async fn create_task(&mut self, title: &str, points: u8, day: Day) -> Result<Task> {
        self.ensure_connected()?;
        let draft = TaskDraft::open(title, points, day, self.board.week())?;
        let task = self
            .gateway
            .create_task(draft)
            .await
            .inspect_err(|e| error!(error = %e, "failed to create task"))?;
        self.board.store.insert(task.clone());
        info!(id = %task.id, title = %task.title, points = task.points, day = %task.day, "task created");
        Ok(task)
    }

    /// Marks an open or virtual task completed by `participant` and queues
    /// it for approval. The participant is credited provisionally.
    pub async fn complete(&mut self, task_id: &str, participant: &Participant) -> Result<Task> {
        self.ensure_connected()?;
        let task = self
            .board
            .find_task(task_id)
            .ok_or_else(|| Error::not_found("task", task_id))?;
        let now = Utc::now();

        let completed = match task.state() {
            TaskState::Virtual => {
                let (template_id, week) = recurrence::parse_virtual_id(&task.id)
                    .ok_or_else(|| Error::not_found("recurring task", &task.id))?;
                let draft = TaskDraft {
                    title: task.title.clone(),
                    points: task.points,
                    day: task.day,
                    week,
                    completed_by: Some(participant.clone()),
                    completed_at: Some(now),
                    recurring_task_id: Some(template_id),
                };
                let created = self
                    .gateway
                    .create_task(draft)
                    .await
                    .inspect_err(|e| error!(id = %task.id, error = %e, "failed to materialize task"))?;
                self.board.store.insert(created.clone());
                created
            }
            TaskState::Open => {
                let update = TaskUpdate::completion(participant.clone(), now);
                let updated = self
                    .gateway
                    .update_task(&task.id, &update)
                    .await
                    .inspect_err(|e| error!(id = %task.id, error = %e, "failed to complete task"))?;
                if !updated {
                    return Err(Error::Write(format!("task {} was not updated", task.id)));
                }
                let mut completed = task.clone();
                update.apply_to(&mut completed, now);
                self.board.store.insert(completed.clone());
                completed
            }
            state => return Err(invalid_transition(&task, state, "complete")),
        };

        let draft = ApprovalDraft::for_task(&completed, participant.clone(), now);
        let approval = match self.gateway.create_pending_approval(draft).await {
            Ok(approval) => approval,
            Err(e) => {
                error!(id = %completed.id, error = %e, "failed to queue approval");
                self.undo_completion(&task, &completed).await;
                return Err(e);
            }
        };
        if self.board.find_approval(&approval.id).is_none() {
            self.board.pending.push(approval);
        }
        self.board.ledger.credit(participant, completed.points);

        info!(
            id = %completed.id,
            participant = %participant,
            points = completed.points,
            "task completed, awaiting approval"
        );
        self.mirror_points().await;
        Ok(completed)
    }

    /// Approves a queued completion. A missing queue record or task is
    /// logged and treated as a no-op.
    pub async fn approve(&mut self, approval_id: &str) -> Result<Option<Celebration>> {
        self.ensure_connected()?;
        let Some((approval, task)) = self.lookup_pending(approval_id, "approve") else {
            return Ok(None);
        };
        let state = task.state();
        if state != TaskState::Pending {
            return Err(invalid_transition(&task, state, "approve"));
        }

        let now = Utc::now();
        let update = TaskUpdate::approval(now);
        if !self.gateway.update_task(&task.id, &update).await? {
            warn!(id = %task.id, "task vanished before approval");
            return Ok(None);
        }
        self.dequeue_or_restore(&approval.id, &task).await?;
        self.board.store.apply_update(&task.id, &update, now);
        self.board.recalculate_points();

        info!(id = %task.id, participant = %approval.child, points = approval.points, "task approved");
        Ok(Some(Celebration {
            participant: approval.child,
            points: approval.points,
            title: approval.title,
        }))
    }

    /// Sends a queued completion back to open and takes back the
    /// provisional credit. A missing queue record or task is logged and
    /// treated as a no-op.
    pub async fn reject(&mut self, approval_id: &str) -> Result<Option<Task>> {
        self.ensure_connected()?;
        let Some((approval, task)) = self.lookup_pending(approval_id, "reject") else {
            return Ok(None);
        };
        let state = task.state();
        if state != TaskState::Pending {
            return Err(invalid_transition(&task, state, "reject"));
        }

        let now = Utc::now();
        let update = TaskUpdate::reopen();
        if !self.gateway.update_task(&task.id, &update).await? {
            warn!(id = %task.id, "task vanished before rejection");
            return Ok(None);
        }
        self.dequeue_or_restore(&approval.id, &task).await?;
        self.board.store.apply_update(&task.id, &update, now);
        self.board.ledger.debit(&approval.child, approval.points);

        info!(id = %task.id, participant = %approval.child, points = approval.points, "task rejected");
        self.mirror_points().await;
        let mut reopened = task;
        update.apply_to(&mut reopened, now);
        Ok(Some(reopened))
    }

    /// Changes title and points of an open task.
    pub async fn edit_task(&mut self, task_id: &str, title: &str, points: u8) -> Result<Task> {
        self.ensure_connected()?;
        let task = self.open_task(task_id, "edit")?;
        let update = TaskUpdate::edit(title, points)?;
        if !self.gateway.update_task(&task.id, &update).await? {
            return Err(Error::not_found("task", task_id));
        }
        let now = Utc::now();
        let mut edited = task;
        update.apply_to(&mut edited, now);
        self.board.store.insert(edited.clone());
        info!(id = %edited.id, title = %edited.title, points = edited.points, "task edited");
        Ok(edited)
    }

    /// Deletes an open task.
    pub async fn delete_task(&mut self, task_id: &str) -> Result<Task> {
        self.ensure_connected()?;
        let task = self.open_task(task_id, "delete")?;
        if !self.gateway.delete_task(&task.id).await? {
            return Err(Error::not_found("task", task_id));
        }
        self.board.store.remove(&task.id);
        info!(id = %task.id, title = %task.title, "task deleted");
        Ok(task)
    }

    pub async fn create_recurring(
        &mut self,
        title: &str,
        points: u8,
        day: Day,
    ) -> Result<RecurringTask> {
        self.ensure_connected()?;
        let draft = RecurringDraft::new(title, points, day)?;
        let template = self.gateway.create_recurring_task(draft).await?;
        if self.board.find_template(&template.id).is_none() {
            self.board.templates.push(template.clone());
        }
        info!(id = %template.id, title = %template.title, day = %template.day, "recurring task created");
        Ok(template)
    }

    /// Edits a template. Weeks where it is already materialized keep their
    /// task as it was.
    pub async fn update_recurring(
        &mut self,
        template_id: &str,
        update: &RecurringUpdate,
    ) -> Result<RecurringTask> {
        self.ensure_connected()?;
        let mut template = self
            .board
            .find_template(template_id)
            .cloned()
            .ok_or_else(|| Error::not_found("recurring task", template_id))?;
        if !self.gateway.update_recurring_task(template_id, update).await? {
            return Err(Error::not_found("recurring task", template_id));
        }
        update.apply_to(&mut template, Utc::now());
        if let Some(slot) = self.board.templates.iter_mut().find(|r| r.id == template.id) {
            *slot = template.clone();
        }
        info!(id = %template.id, "recurring task updated");
        Ok(template)
    }

    pub async fn delete_recurring(&mut self, template_id: &str) -> Result<()> {
        self.ensure_connected()?;
        if !self.gateway.delete_recurring_task(template_id).await? {
            return Err(Error::not_found("recurring task", template_id));
        }
        self.board.templates.retain(|r| r.id != template_id);
        info!(id = %template_id, "recurring task deleted");
        Ok(())
    }

    /// Start-of-week reset: every task of the current bucket back to open,
    /// the approval queue emptied, totals zeroed and one open task
    /// materialized per template. Records the week as reset.
    ///
    /// A failed write is logged and the remaining items are still
    /// processed. The week is then left unrecorded and `Error::Write` is
    /// returned, so the next check runs the reset again. Repeating it only
    /// touches what is left.
    pub async fn weekly_reset(&mut self) -> Result<ResetSummary> {
        self.ensure_connected()?;
        let week = self.board.week();
        let now = Utc::now();
        let mut summary = ResetSummary {
            week: Some(week),
            ..Default::default()
        };
        let mut failed = 0;

        let update = TaskUpdate::reopen();
        let touched: Vec<String> = self
            .board
            .store
            .tasks_for_week(week)
            .iter()
            .filter(|t| t.completed || t.approved)
            .map(|t| t.id.clone())
            .collect();
        for id in touched {
            match self.gateway.update_task(&id, &update).await {
                Ok(true) => {
                    self.board.store.apply_update(&id, &update, now);
                    summary.reopened += 1;
                }
                Ok(false) => warn!(%id, "task missing from gateway during reset"),
                Err(e) => {
                    error!(%id, error = %e, "failed to reopen task during reset");
                    failed += 1;
                }
            }
        }

        let queued: Vec<String> = self.board.pending.iter().map(|a| a.id.clone()).collect();
        for id in queued {
            match self.gateway.delete_pending_approval(&id).await {
                Ok(found) => {
                    if !found {
                        warn!(%id, "pending approval missing from gateway during reset");
                    }
                    self.board.pending.retain(|a| a.id != id);
                    summary.cleared_approvals += 1;
                }
                Err(e) => {
                    error!(%id, error = %e, "failed to clear pending approval during reset");
                    failed += 1;
                }
            }
        }
        self.board.ledger.reset();

        let templates = self.board.templates.clone();
        for template in templates {
            if recurrence::is_materialized(&self.board.store, &template, week) {
                continue;
            }
            let draft = TaskDraft {
                title: template.title.clone(),
                points: template.points,
                day: template.day,
                week,
                completed_by: None,
                completed_at: None,
                recurring_task_id: Some(template.id.clone()),
            };
            match self.gateway.create_task(draft).await {
                Ok(created) => {
                    self.board.store.insert(created);
                    summary.materialized += 1;
                }
                Err(e) => {
                    error!(template = %template.id, error = %e, "failed to materialize template during reset");
                    failed += 1;
                }
            }
        }

        self.board.recalculate_points();
        self.mirror_points().await;
        if failed > 0 {
            warn!(%week, failed, "weekly reset incomplete");
            return Err(Error::Write(format!(
                "weekly reset of {} incomplete: {} writes failed",
                week, failed
            )));
        }

        self.gateway.record_reset(week).await?;
        info!(
            %week,
            reopened = summary.reopened,
            cleared = summary.cleared_approvals,
            materialized = summary.materialized,
            "weekly reset"
        );
        Ok(summary)
    }

    /// Follows the calendar to the week of `today` and resets once per week.
    ///
    /// The last reset week is stored by the gateway, so the reset runs once
    /// across all clients and also when a client stays open past Monday. A
    /// store that has never been reset records the week without resetting.
    pub async fn check_weekly_reset(&mut self, today: NaiveDate) -> Result<Option<ResetSummary>> {
        self.ensure_connected()?;
        let week = WeekKey::of(today);
        self.change_week(week).await?;
        match self.gateway.last_reset().await? {
            None => {
                self.gateway.record_reset(week).await?;
                info!(%week, "first run, no reset needed");
                Ok(None)
            }
            Some(last) if last >= week => Ok(None),
            Some(last) => {
                info!(%last, %week, "new week since last reset");
                self.weekly_reset().await.map(Some)
            }
        }
    }

    /// Subscribes to `week` unless an earlier subscription still delivers.
    async fn subscribe_week(&mut self, week: WeekKey) -> Result<()> {
        if self.subscribed.contains(&week) {
            return Ok(());
        }
        self.gateway.subscribe(week, self.events.clone()).await?;
        self.subscribed.insert(week);
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::GatewayUnavailable)
        }
    }

    fn lookup_pending(
        &self,
        approval_id: &str,
        action: &str,
    ) -> Option<(PendingApproval, Task)> {
        let Some(approval) = self.board.find_approval(approval_id).cloned() else {
            warn!(id = %approval_id, action, "pending approval not found");
            return None;
        };
        let Some(task) = self.board.store.find(&approval.task_id).cloned() else {
            warn!(id = %approval_id, task = %approval.task_id, action, "task for pending approval not found");
            return None;
        };
        Some((approval, task))
    }

    fn open_task(&self, task_id: &str, action: &'static str) -> Result<Task> {
        let task = self
            .board
            .find_task(task_id)
            .ok_or_else(|| Error::not_found("task", task_id))?;
        match task.state() {
            TaskState::Open => Ok(task),
            state => Err(invalid_transition(&task, state, action)),
        }
    }

    async fn remove_approval(&mut self, approval_id: &str) -> Result<()> {
        if !self.gateway.delete_pending_approval(approval_id).await? {
            warn!(id = %approval_id, "pending approval already gone from gateway");
        }
        self.board.pending.retain(|a| a.id != approval_id);
        Ok(())
    }

    /// Removes the queue record of a task whose update is already written.
    /// If the record cannot be removed the task is written back to
    /// `original`, so task and queue stay in step and the call can be
    /// retried.
    async fn dequeue_or_restore(&mut self, approval_id: &str, original: &Task) -> Result<()> {
        let Err(e) = self.remove_approval(approval_id).await else {
            return Ok(());
        };
        error!(id = %approval_id, error = %e, "failed to remove pending approval");
        let restore = TaskUpdate::restoring(original);
        if let Err(undo) = self.gateway.update_task(&original.id, &restore).await {
            error!(id = %original.id, error = %undo, "could not restore task");
        }
        Err(e)
    }

    /// Puts a completion back after its approval record could not be
    /// written.
    async fn undo_completion(&mut self, original: &Task, completed: &Task) {
        let undone = if original.is_virtual() {
            self.gateway.delete_task(&completed.id).await.map(|found| {
                if found {
                    self.board.store.remove(&completed.id);
                }
            })
        } else {
            let update = TaskUpdate::reopen();
            self.gateway.update_task(&completed.id, &update).await.map(|found| {
                if found {
                    self.board.store.insert(original.clone());
                }
            })
        };
        if let Err(e) = undone {
            error!(id = %completed.id, error = %e, "could not undo completion");
        }
    }

    /// Best-effort mirror of the ledger through the gateway.
    async fn mirror_points(&self) {
        match self.gateway.update_points_snapshot(&self.board.ledger).await {
            Ok(true) => {}
            Ok(false) => warn!("points snapshot was not stored"),
            Err(e) => warn!(error = %e, "failed to mirror points"),
        }
    }
}

fn invalid_transition(task: &Task, state: TaskState, action: &'static str) -> Error {
    Error::InvalidTransition {
        id: task.id.clone(),
        state: state.to_string(),
        action,
    }
}
