//! JSON-file persistence gateway with snapshot subscriptions.

use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::calendar::WeekKey;
use crate::error::{Error, Result};
use crate::gateway::{EventSender, GatewayEvent, PersistenceGateway};
use crate::ledger::Ledger;
use crate::models::{
    ApprovalDraft, PendingApproval, RecurringDraft, RecurringTask, RecurringUpdate, Task,
    TaskDraft, TaskUpdate,
};

const TASKS_FILE: &str = "tasks.json";
const RECURRING_FILE: &str = "recurring.json";
const APPROVALS_FILE: &str = "approvals.json";
const META_FILE: &str = "meta.json";

/// Mirrored ledger and reset marker.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    points: Option<Ledger>,
    #[serde(default)]
    points_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_reset: Option<WeekKey>,
}

#[derive(Debug, Clone, Default)]
struct Collections {
    tasks: Vec<Task>,
    recurring: Vec<RecurringTask>,
    approvals: Vec<PendingApproval>,
    meta: Meta,
}

#[derive(Clone, Copy)]
enum Collection {
    Tasks,
    Recurring,
    Approvals,
    Meta,
}

#[derive(Default)]
struct Subscribers {
    weeks: Vec<(WeekKey, EventSender)>,
    recurring: Vec<EventSender>,
    approvals: Vec<EventSender>,
}

/// Gateway backed by JSON files in a data directory, or by memory alone.
///
/// Each write goes to disk before the in-memory copy is replaced, so a
/// failed write leaves both untouched.
pub struct LocalGateway {
    dir: Option<PathBuf>,
    state: Mutex<Collections>,
    subscribers: Mutex<Subscribers>,
}

impl LocalGateway {
    /// Opens (creating if needed) the store in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let state = Collections {
            tasks: load_json(&dir.join(TASKS_FILE))?.unwrap_or_default(),
            recurring: load_json(&dir.join(RECURRING_FILE))?.unwrap_or_default(),
            approvals: load_json(&dir.join(APPROVALS_FILE))?.unwrap_or_default(),
            meta: load_json(&dir.join(META_FILE))?.unwrap_or_default(),
        };
        debug!(
            dir = %dir.display(),
            tasks = state.tasks.len(),
            recurring = state.recurring.len(),
            approvals = state.approvals.len(),
            "opened local store"
        );
        Ok(LocalGateway {
            dir: Some(dir.to_path_buf()),
            state: Mutex::new(state),
            subscribers: Mutex::new(Subscribers::default()),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        LocalGateway {
            dir: None,
            state: Mutex::new(Collections::default()),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Last mirrored ledger, if any.
    pub fn points_snapshot(&self) -> Result<Option<Ledger>> {
        Ok(self.lock_state()?.meta.points.clone())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, Collections>> {
        self.state.lock().map_err(|_| Error::GatewayUnavailable)
    }

    fn lock_subscribers(&self) -> Result<MutexGuard<'_, Subscribers>> {
        self.subscribers.lock().map_err(|_| Error::GatewayUnavailable)
    }

    /// Runs `f` on a copy of the collections, persists `changed`, then
    /// swaps the copy in.
    fn mutate<R>(&self, changed: Collection, f: impl FnOnce(&mut Collections) -> R) -> Result<R> {
        let mut state = self.lock_state()?;
        let mut next = state.clone();
        let out = f(&mut next);
        self.persist(&next, changed)?;
        *state = next;
        Ok(out)
    }

    fn persist(&self, state: &Collections, changed: Collection) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let written = match changed {
            Collection::Tasks => save_json(&dir.join(TASKS_FILE), &state.tasks),
            Collection::Recurring => save_json(&dir.join(RECURRING_FILE), &state.recurring),
            Collection::Approvals => save_json(&dir.join(APPROVALS_FILE), &state.approvals),
            Collection::Meta => save_json(&dir.join(META_FILE), &state.meta),
        };
        written.map_err(|e| {
            error!(dir = %dir.display(), error = %e, "failed to write local store");
            Error::Write(e.to_string())
        })
    }

    fn week_snapshot(&self, week: WeekKey) -> Result<Vec<Task>> {
        Ok(self
            .lock_state()?
            .tasks
            .iter()
            .filter(|t| t.week_key() == week)
            .cloned()
            .collect())
    }

    fn notify_week(&self, week: WeekKey) -> Result<()> {
        let tasks = self.week_snapshot(week)?;
        let mut subs = self.lock_subscribers()?;
        subs.weeks.retain(|(w, sink)| {
            *w != week
                || sink
                    .send(GatewayEvent::Tasks {
                        week,
                        tasks: tasks.clone(),
                    })
                    .is_ok()
        });
        Ok(())
    }

    fn notify_recurring(&self) -> Result<()> {
        let templates = self.lock_state()?.recurring.clone();
        let mut subs = self.lock_subscribers()?;
        subs.recurring
            .retain(|sink| sink.send(GatewayEvent::RecurringTasks(templates.clone())).is_ok());
        Ok(())
    }

    fn notify_approvals(&self) -> Result<()> {
        let approvals = self.lock_state()?.approvals.clone();
        let mut subs = self.lock_subscribers()?;
        subs.approvals
            .retain(|sink| sink.send(GatewayEvent::PendingApprovals(approvals.clone())).is_ok());
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for LocalGateway {
    async fn test_connection(&self) -> Result<()> {
        drop(self.lock_state()?);
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let probe = dir.join(".probe");
        fs::write(&probe, b"weekchores connection test")
            .and_then(|_| fs::remove_file(&probe))
            .map_err(|e| {
                error!(dir = %dir.display(), error = %e, "local store is not writable");
                Error::GatewayUnavailable
            })
    }

    async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        let task = draft.into_task(new_id(), Utc::now());
        let created = task.clone();
        self.mutate(Collection::Tasks, |c| c.tasks.push(task))?;
        self.notify_week(created.week_key())?;
        Ok(created)
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<bool> {
        let now = Utc::now();
        let week = self.mutate(Collection::Tasks, |c| {
            c.tasks.iter_mut().find(|t| t.id == id).map(|t| {
                update.apply_to(t, now);
                t.week_key()
            })
        })?;
        match week {
            Some(week) => {
                self.notify_week(week)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let week = self.mutate(Collection::Tasks, |c| {
            let index = c.tasks.iter().position(|t| t.id == id)?;
            Some(c.tasks.remove(index).week_key())
        })?;
        match week {
            Some(week) => {
                self.notify_week(week)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn tasks_for_week(&self, week: WeekKey) -> Result<Vec<Task>> {
        self.week_snapshot(week)
    }

    async fn subscribe(&self, week: WeekKey, sink: EventSender) -> Result<()> {
        let tasks = self.week_snapshot(week)?;
        if sink.send(GatewayEvent::Tasks { week, tasks }).is_ok() {
            let mut subs = self.lock_subscribers()?;
            subs.weeks
                .retain(|(w, existing)| *w != week || !existing.same_channel(&sink));
            subs.weeks.push((week, sink));
        }
        Ok(())
    }

    async fn create_recurring_task(&self, draft: RecurringDraft) -> Result<RecurringTask> {
        let now = Utc::now();
        let template = RecurringTask {
            id: new_id(),
            title: draft.title,
            points: draft.points,
            day: draft.day,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let created = template.clone();
        self.mutate(Collection::Recurring, |c| c.recurring.push(template))?;
        self.notify_recurring()?;
        Ok(created)
    }

    async fn update_recurring_task(&self, id: &str, update: &RecurringUpdate) -> Result<bool> {
        let now = Utc::now();
        let found = self.mutate(Collection::Recurring, |c| {
            c.recurring
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| update.apply_to(r, now))
                .is_some()
        })?;
        if found {
            self.notify_recurring()?;
        }
        Ok(found)
    }

    async fn delete_recurring_task(&self, id: &str) -> Result<bool> {
        let found = self.mutate(Collection::Recurring, |c| {
            let before = c.recurring.len();
            c.recurring.retain(|r| r.id != id);
            c.recurring.len() != before
        })?;
        if found {
            self.notify_recurring()?;
        }
        Ok(found)
    }

    async fn list_recurring_tasks(&self) -> Result<Vec<RecurringTask>> {
        Ok(self.lock_state()?.recurring.clone())
    }

    async fn subscribe_recurring_tasks(&self, sink: EventSender) -> Result<()> {
        let templates = self.lock_state()?.recurring.clone();
        if sink.send(GatewayEvent::RecurringTasks(templates)).is_ok() {
            self.lock_subscribers()?.recurring.push(sink);
        }
        Ok(())
    }

    async fn create_pending_approval(&self, draft: ApprovalDraft) -> Result<PendingApproval> {
        let approval = draft.into_approval(new_id(), Utc::now());
        let created = approval.clone();
        self.mutate(Collection::Approvals, |c| c.approvals.push(approval))?;
        self.notify_approvals()?;
        Ok(created)
    }

    async fn delete_pending_approval(&self, id: &str) -> Result<bool> {
        let found = self.mutate(Collection::Approvals, |c| {
            let before = c.approvals.len();
            c.approvals.retain(|a| a.id != id);
            c.approvals.len() != before
        })?;
        if found {
            self.notify_approvals()?;
        }
        Ok(found)
    }

    async fn subscribe_pending_approvals(&self, sink: EventSender) -> Result<()> {
        let approvals = self.lock_state()?.approvals.clone();
        if sink.send(GatewayEvent::PendingApprovals(approvals)).is_ok() {
            self.lock_subscribers()?.approvals.push(sink);
        }
        Ok(())
    }

    async fn update_points_snapshot(&self, ledger: &Ledger) -> Result<bool> {
        let ledger = ledger.clone();
        self.mutate(Collection::Meta, |c| {
            c.meta.points = Some(ledger);
            c.meta.points_updated_at = Some(Utc::now());
        })?;
        Ok(true)
    }

    async fn last_reset(&self) -> Result<Option<WeekKey>> {
        Ok(self.lock_state()?.meta.last_reset)
    }

    async fn record_reset(&self, week: WeekKey) -> Result<()> {
        self.mutate(Collection::Meta, |c| c.meta.last_reset = Some(week))
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reads a JSON document. Returns `None` if the file does not exist.
fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut f = OpenOptions::new().read(true).open(path)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    if s.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&s)?))
}

/// Overwrites `path` with `value` as pretty JSON.
fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
