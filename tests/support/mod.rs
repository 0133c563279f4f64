#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use weekchores::board::Board;
use weekchores::calendar::WeekKey;
use weekchores::gateway::{EventSender, PersistenceGateway};
use weekchores::ledger::Ledger;
use weekchores::models::{
    ApprovalDraft, Participant, PendingApproval, RecurringDraft, RecurringTask, RecurringUpdate,
    Task, TaskDraft, TaskUpdate,
};
use weekchores::storage::LocalGateway;
use weekchores::workflow::Workflow;
use weekchores::{Error, Result};

pub fn week() -> WeekKey {
    WeekKey::new(2025, 10)
}

pub fn simon() -> Participant {
    Participant::parse("Simon").expect("valid participant")
}

pub fn noah() -> Participant {
    Participant::parse("Noah").expect("valid participant")
}

pub fn roster() -> Vec<Participant> {
    vec![simon(), noah()]
}

/// A connected workflow on week 2025-W10.
pub async fn connected<G: PersistenceGateway>(gateway: Arc<G>) -> Workflow<G> {
    let mut wf = Workflow::new(gateway, Board::new(roster(), week()));
    wf.connect().await.expect("connect");
    wf
}

pub async fn local_workflow() -> (Arc<LocalGateway>, Workflow<LocalGateway>) {
    let gateway = Arc::new(LocalGateway::in_memory());
    let wf = connected(gateway.clone()).await;
    (gateway, wf)
}

pub async fn flaky_workflow() -> (Arc<FlakyGateway>, Workflow<FlakyGateway>) {
    let gateway = Arc::new(FlakyGateway::new());
    let wf = connected(gateway.clone()).await;
    (gateway, wf)
}

/// In-memory gateway whose availability and writes can be switched off.
pub struct FlakyGateway {
    inner: LocalGateway,
    offline: AtomicBool,
    fail_writes: AtomicBool,
    fail_approvals: AtomicBool,
    fail_approval_deletes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyGateway {
    pub fn new() -> Self {
        FlakyGateway {
            inner: LocalGateway::in_memory(),
            offline: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_approvals: AtomicBool::new(false),
            fail_approval_deletes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &LocalGateway {
        &self.inner
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails only `create_pending_approval`.
    pub fn set_fail_approvals(&self, fail: bool) {
        self.fail_approvals.store(fail, Ordering::SeqCst);
    }

    /// Fails only `delete_pending_approval`.
    pub fn set_fail_approval_deletes(&self, fail: bool) {
        self.fail_approval_deletes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::GatewayUnavailable);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Write("simulated write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::GatewayUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for FlakyGateway {
    async fn test_connection(&self) -> Result<()> {
        self.read()?;
        self.inner.test_connection().await
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        self.write()?;
        self.inner.create_task(draft).await
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<bool> {
        self.write()?;
        self.inner.update_task(id, update).await
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        self.write()?;
        self.inner.delete_task(id).await
    }

    async fn tasks_for_week(&self, week: WeekKey) -> Result<Vec<Task>> {
        self.read()?;
        self.inner.tasks_for_week(week).await
    }

    async fn subscribe(&self, week: WeekKey, sink: EventSender) -> Result<()> {
        self.read()?;
        self.inner.subscribe(week, sink).await
    }

    async fn create_recurring_task(&self, draft: RecurringDraft) -> Result<RecurringTask> {
        self.write()?;
        self.inner.create_recurring_task(draft).await
    }

    async fn update_recurring_task(&self, id: &str, update: &RecurringUpdate) -> Result<bool> {
        self.write()?;
        self.inner.update_recurring_task(id, update).await
    }

    async fn delete_recurring_task(&self, id: &str) -> Result<bool> {
        self.write()?;
        self.inner.delete_recurring_task(id).await
    }

    async fn list_recurring_tasks(&self) -> Result<Vec<RecurringTask>> {
        self.read()?;
        self.inner.list_recurring_tasks().await
    }

    async fn subscribe_recurring_tasks(&self, sink: EventSender) -> Result<()> {
        self.read()?;
        self.inner.subscribe_recurring_tasks(sink).await
    }

    async fn create_pending_approval(&self, draft: ApprovalDraft) -> Result<PendingApproval> {
        if self.fail_approvals.load(Ordering::SeqCst) {
            return Err(Error::Write("simulated approval write failure".to_string()));
        }
        self.write()?;
        self.inner.create_pending_approval(draft).await
    }

    async fn delete_pending_approval(&self, id: &str) -> Result<bool> {
        if self.fail_approval_deletes.load(Ordering::SeqCst) {
            return Err(Error::Write("simulated approval delete failure".to_string()));
        }
        self.write()?;
        self.inner.delete_pending_approval(id).await
    }

    async fn subscribe_pending_approvals(&self, sink: EventSender) -> Result<()> {
        self.read()?;
        self.inner.subscribe_pending_approvals(sink).await
    }

    async fn update_points_snapshot(&self, ledger: &Ledger) -> Result<bool> {
        self.write()?;
        self.inner.update_points_snapshot(ledger).await
    }

    async fn last_reset(&self) -> Result<Option<WeekKey>> {
        self.read()?;
        self.inner.last_reset().await
    }

    async fn record_reset(&self, week: WeekKey) -> Result<()> {
        self.write()?;
        self.inner.record_reset(week).await
    }
}
