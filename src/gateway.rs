//! Persistence gateway contract.
//!
//! The gateway owns durable storage. Change notifications are pushed as full
//! snapshots onto an unbounded channel; the consumer treats each one as an
//! authoritative replacement of the collection it names.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::calendar::WeekKey;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::{
    ApprovalDraft, PendingApproval, RecurringDraft, RecurringTask, RecurringUpdate, Task,
    TaskDraft, TaskUpdate,
};

/// Snapshot pushed by a gateway subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Full contents of one bucket.
    Tasks { week: WeekKey, tasks: Vec<Task> },
    RecurringTasks(Vec<RecurringTask>),
    PendingApprovals(Vec<PendingApproval>),
}

pub type EventSender = mpsc::UnboundedSender<GatewayEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GatewayEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fails with `GatewayUnavailable` if the backing store cannot be used.
    async fn test_connection(&self) -> Result<()>;

    async fn create_task(&self, draft: TaskDraft) -> Result<Task>;
    /// `Ok(false)` if no task has `id`.
    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<bool>;
    /// `Ok(false)` if no task has `id`.
    async fn delete_task(&self, id: &str) -> Result<bool>;
    async fn tasks_for_week(&self, week: WeekKey) -> Result<Vec<Task>>;
    /// Pushes the current bucket immediately, then again on every change.
    /// Subscribing the same sink to the same week again keeps one
    /// subscription.
    async fn subscribe(&self, week: WeekKey, sink: EventSender) -> Result<()>;

    async fn create_recurring_task(&self, draft: RecurringDraft) -> Result<RecurringTask>;
    async fn update_recurring_task(&self, id: &str, update: &RecurringUpdate) -> Result<bool>;
    async fn delete_recurring_task(&self, id: &str) -> Result<bool>;
    async fn list_recurring_tasks(&self) -> Result<Vec<RecurringTask>>;
    async fn subscribe_recurring_tasks(&self, sink: EventSender) -> Result<()>;

    async fn create_pending_approval(&self, draft: ApprovalDraft) -> Result<PendingApproval>;
    async fn delete_pending_approval(&self, id: &str) -> Result<bool>;
    async fn subscribe_pending_approvals(&self, sink: EventSender) -> Result<()>;

    /// Best-effort mirror of the ledger; never read back by the workflow.
    async fn update_points_snapshot(&self, ledger: &Ledger) -> Result<bool>;

    /// Week the last weekly reset ran for, if any.
    async fn last_reset(&self) -> Result<Option<WeekKey>>;
    async fn record_reset(&self, week: WeekKey) -> Result<()>;
}
