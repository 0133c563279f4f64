use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::WeekKey;
use crate::error::{Error, Result};

/// Lowest point value a task or template may carry.
pub const MIN_POINTS: u8 = 1;
/// Highest point value a task or template may carry.
pub const MAX_POINTS: u8 = 5;

/// Prefix of the synthetic ids given to recurring projections.
pub const VIRTUAL_ID_PREFIX: &str = "recurring-";

/// Day-of-week label. Serialized with the household's Norwegian names.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Day {
    Mandag,
    Tirsdag,
    Onsdag,
    Torsdag,
    Fredag,
    #[serde(rename = "Lørdag")]
    Lordag,
    #[serde(rename = "Søndag")]
    Sondag,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mandag,
        Day::Tirsdag,
        Day::Onsdag,
        Day::Torsdag,
        Day::Fredag,
        Day::Lordag,
        Day::Sondag,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Day::Mandag => "Mandag",
            Day::Tirsdag => "Tirsdag",
            Day::Onsdag => "Onsdag",
            Day::Torsdag => "Torsdag",
            Day::Fredag => "Fredag",
            Day::Lordag => "Lørdag",
            Day::Sondag => "Søndag",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Mandag,
            Weekday::Tue => Day::Tirsdag,
            Weekday::Wed => Day::Onsdag,
            Weekday::Thu => Day::Torsdag,
            Weekday::Fri => Day::Fredag,
            Weekday::Sat => Day::Lordag,
            Weekday::Sun => Day::Sondag,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Day {
    type Err = Error;

    /// Accepts the Norwegian labels (with or without æøå) and English names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let day = match s.trim().to_lowercase().as_str() {
            "mandag" | "monday" | "mon" => Day::Mandag,
            "tirsdag" | "tuesday" | "tue" => Day::Tirsdag,
            "onsdag" | "wednesday" | "wed" => Day::Onsdag,
            "torsdag" | "thursday" | "thu" => Day::Torsdag,
            "fredag" | "friday" | "fri" => Day::Fredag,
            "lørdag" | "lordag" | "saturday" | "sat" => Day::Lordag,
            "søndag" | "sondag" | "sunday" | "sun" => Day::Sondag,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown day '{}', use Mandag..Søndag",
                    s
                )))
            }
        };
        Ok(day)
    }
}

/// Someone who earns points by completing tasks.
///
/// Kept as a validated name rather than a closed enum: the roster lives in
/// configuration and the core never rejects a name that is not on it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("participant name is empty".into()));
        }
        Ok(Participant(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle position of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Projection of a recurring template, not persisted yet.
    Virtual,
    /// Persisted and incomplete.
    Open,
    /// Completed, waiting for approval.
    Pending,
    Approved,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Virtual => "virtual",
            TaskState::Open => "open",
            TaskState::Pending => "pending",
            TaskState::Approved => "approved",
        };
        f.write_str(s)
    }
}

/// A unit of work assigned to a day of a specific week.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Assigned by the persistence gateway, or synthetic for projections.
    pub id: String,
    pub title: String,
    pub points: u8,
    pub day: Day,
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub approved: bool,
    /// Set iff `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<Participant>,
    /// Set iff `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set iff `approved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Template this task was materialized from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn week_key(&self) -> WeekKey {
        WeekKey::new(self.year, self.week)
    }

    pub fn is_virtual(&self) -> bool {
        self.id.starts_with(VIRTUAL_ID_PREFIX)
    }

    pub fn state(&self) -> TaskState {
        if self.is_virtual() {
            TaskState::Virtual
        } else if self.approved {
            TaskState::Approved
        } else if self.completed {
            TaskState::Pending
        } else {
            TaskState::Open
        }
    }
}

/// A task before the gateway has given it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub points: u8,
    pub day: Day,
    pub week: WeekKey,
    pub completed_by: Option<Participant>,
    pub completed_at: Option<DateTime<Utc>>,
    pub recurring_task_id: Option<String>,
}

impl TaskDraft {
    /// An open task for `day` of `week`. Validates title and points.
    pub fn open(title: &str, points: u8, day: Day, week: WeekKey) -> Result<Self> {
        Ok(TaskDraft {
            title: validate_title(title)?,
            points: validate_points(points)?,
            day,
            week,
            completed_by: None,
            completed_at: None,
            recurring_task_id: None,
        })
    }

    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            points: self.points,
            day: self.day,
            year: self.week.year,
            week: self.week.week,
            completed: self.completed_by.is_some(),
            approved: false,
            completed_by: self.completed_by,
            completed_at: self.completed_at,
            approved_at: None,
            recurring_task_id: self.recurring_task_id,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Partial field update for a task. `None` leaves a field untouched; the
/// nested options on the optional fields allow clearing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub points: Option<u8>,
    pub completed: Option<bool>,
    pub approved: Option<bool>,
    pub completed_by: Option<Option<Participant>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub approved_at: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    pub fn edit(title: &str, points: u8) -> Result<Self> {
        Ok(TaskUpdate {
            title: Some(validate_title(title)?),
            points: Some(validate_points(points)?),
            ..Default::default()
        })
    }

    pub fn completion(participant: Participant, at: DateTime<Utc>) -> Self {
        TaskUpdate {
            completed: Some(true),
            completed_by: Some(Some(participant)),
            completed_at: Some(Some(at)),
            ..Default::default()
        }
    }

    pub fn approval(at: DateTime<Utc>) -> Self {
        TaskUpdate {
            approved: Some(true),
            approved_at: Some(Some(at)),
            ..Default::default()
        }
    }

    /// Back to open: completion and approval fields cleared.
    pub fn reopen() -> Self {
        TaskUpdate {
            completed: Some(false),
            approved: Some(false),
            completed_by: Some(None),
            completed_at: Some(None),
            approved_at: Some(None),
            ..Default::default()
        }
    }

    /// Puts completion and approval fields back to what `task` holds.
    pub fn restoring(task: &Task) -> Self {
        TaskUpdate {
            completed: Some(task.completed),
            approved: Some(task.approved),
            completed_by: Some(task.completed_by.clone()),
            completed_at: Some(task.completed_at),
            approved_at: Some(task.approved_at),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(t) = &self.title {
            task.title = t.clone();
        }
        if let Some(p) = self.points {
            task.points = p;
        }
        if let Some(c) = self.completed {
            task.completed = c;
        }
        if let Some(a) = self.approved {
            task.approved = a;
        }
        if let Some(by) = &self.completed_by {
            task.completed_by = by.clone();
        }
        if let Some(at) = self.completed_at {
            task.completed_at = at;
        }
        if let Some(at) = self.approved_at {
            task.approved_at = at;
        }
        task.updated_at = Some(now);
    }
}

/// A standing rule projecting one task onto every week.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTask {
    pub id: String,
    pub title: String,
    pub points: u8,
    pub day: Day,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Template fields before the gateway assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringDraft {
    pub title: String,
    pub points: u8,
    pub day: Day,
}

impl RecurringDraft {
    pub fn new(title: &str, points: u8, day: Day) -> Result<Self> {
        Ok(RecurringDraft {
            title: validate_title(title)?,
            points: validate_points(points)?,
            day,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringUpdate {
    pub title: Option<String>,
    pub points: Option<u8>,
    pub day: Option<Day>,
}

impl RecurringUpdate {
    pub fn new(title: Option<&str>, points: Option<u8>, day: Option<Day>) -> Result<Self> {
        Ok(RecurringUpdate {
            title: title.map(validate_title).transpose()?,
            points: points.map(validate_points).transpose()?,
            day,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.points.is_none() && self.day.is_none()
    }

    pub fn apply_to(&self, template: &mut RecurringTask, now: DateTime<Utc>) {
        if let Some(t) = &self.title {
            template.title = t.clone();
        }
        if let Some(p) = self.points {
            template.points = p;
        }
        if let Some(d) = self.day {
            template.day = d;
        }
        template.updated_at = Some(now);
    }
}

/// Queue record bridging "completed" and "approved".
///
/// Title and points are copied from the task so the queue still reads
/// correctly if the task record changes afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub points: u8,
    pub child: Participant,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalDraft {
    pub task_id: String,
    pub title: String,
    pub points: u8,
    pub child: Participant,
    pub completed_at: DateTime<Utc>,
}

impl ApprovalDraft {
    pub fn for_task(task: &Task, child: Participant, completed_at: DateTime<Utc>) -> Self {
        ApprovalDraft {
            task_id: task.id.clone(),
            title: task.title.clone(),
            points: task.points,
            child,
            completed_at,
        }
    }

    pub fn into_approval(self, id: String, now: DateTime<Utc>) -> PendingApproval {
        PendingApproval {
            id,
            task_id: self.task_id,
            title: self.title,
            points: self.points,
            child: self.child,
            completed_at: self.completed_at,
            created_at: Some(now),
        }
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn validate_points(points: u8) -> Result<u8> {
    if !(MIN_POINTS..=MAX_POINTS).contains(&points) {
        return Err(Error::InvalidArgument(format!(
            "points must be between {} and {}, got {}",
            MIN_POINTS, MAX_POINTS, points
        )));
    }
    Ok(points)
}
