use chrono::Local;
use crossterm::event::KeyCode;
use ratatui::widgets::TableState;
use tracing::{debug, warn};

use crate::calendar::{self, WeekKey};
use crate::error::{Error, Result};
use crate::gateway::PersistenceGateway;
use crate::ledger::{Ledger, WeekPoints};
use crate::models::{Day, PendingApproval, RecurringTask, RecurringUpdate, Task, TaskState};
use crate::workflow::{Celebration, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Week,
    Approvals,
    Recurring,
    Points,
}

impl View {
    pub const ALL: [View; 4] = [View::Week, View::Approvals, View::Recurring, View::Points];

    pub fn index(self) -> usize {
        View::ALL.iter().position(|v| *v == self).unwrap_or(0)
    }

    fn next(self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Adding,
    Editing,
    /// Picking who completed the selected task
    ChoosingParticipant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    Title,
    Points,
    Day,
}

/// State for the multi-step add wizard (title, points, then day for
/// recurring tasks).
#[derive(Debug, Default)]
pub struct AddState {
    pub title: String,
    pub points: Option<u8>,
    pub step: usize,
}

#[derive(Debug, Clone)]
pub enum Status {
    Info(String),
    Celebrate(Celebration),
    Error(String),
}

pub struct App<G: PersistenceGateway> {
    pub workflow: Workflow<G>,
    pub view: View,
    pub day: Day,
    pub tasks: Vec<Task>,
    pub pending: Vec<PendingApproval>,
    pub templates: Vec<RecurringTask>,
    pub history: Vec<WeekPoints>,
    pub overall: Ledger,
    pub state: TableState,
    pub approval_state: TableState,
    pub template_state: TableState,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub add_state: AddState,
    pub target_id: Option<String>,
    pub status: Option<Status>,
    pub should_quit: bool,
    calendar_week: WeekKey,
}

impl<G: PersistenceGateway> App<G> {
    pub fn new(workflow: Workflow<G>) -> Self {
        let mut app = App {
            workflow,
            view: View::Week,
            day: calendar::today(),
            tasks: Vec::new(),
            pending: Vec::new(),
            templates: Vec::new(),
            history: Vec::new(),
            overall: Ledger::default(),
            state: TableState::default(),
            approval_state: TableState::default(),
            template_state: TableState::default(),
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            add_state: AddState::default(),
            target_id: None,
            status: None,
            should_quit: false,
            calendar_week: WeekKey::current(),
        };
        app.reload();
        app
    }

    /// Folds in gateway snapshots and refreshes the visible lists.
    pub fn reload(&mut self) {
        let applied = self.workflow.pump_events();
        if applied > 0 {
            debug!(applied, "applied gateway snapshots");
        }
        let board = self.workflow.board();
        self.tasks = board.tasks_for_day(self.day);
        self.pending = board.pending().to_vec();
        self.templates = board.templates().to_vec();
        clamp_selection(&mut self.state, self.tasks.len());
        clamp_selection(&mut self.approval_state, self.pending.len());
        clamp_selection(&mut self.template_state, self.templates.len());
    }

    /// Runs between key presses. Picks up snapshots and performs the
    /// weekly reset when the calendar has moved into a new week.
    pub async fn on_tick(&mut self) {
        let current = WeekKey::current();
        if current != self.calendar_week {
            self.calendar_week = current;
            match self.workflow.check_weekly_reset(Local::now().date_naive()).await {
                Ok(Some(summary)) => {
                    self.status = Some(Status::Info(format!(
                        "New week {}: {} tasks reopened",
                        current, summary.reopened
                    )))
                }
                Ok(None) => {}
                Err(e) => self.report(e),
            }
        }
        self.reload();
    }

    pub async fn handle_key(&mut self, code: KeyCode) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(code).await,
            InputMode::ChoosingParticipant => match code {
                KeyCode::Char(c) => {
                    // Roster positions are shown from 1
                    if let Some(index) = c.to_digit(10).and_then(|d| (d as usize).checked_sub(1)) {
                        self.input_mode = InputMode::Normal;
                        self.complete_selected(index).await;
                    }
                }
                KeyCode::Esc => self.cancel_input(),
                _ => {}
            },
            InputMode::Adding | InputMode::Editing => match code {
                KeyCode::Enter => self.handle_input().await,
                KeyCode::Esc => self.cancel_input(),
                KeyCode::Char(c) => self.input_buffer.push(c),
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                _ => {}
            },
        }
    }

    async fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Char('v') => self.switch_view(self.view.next()).await,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            _ => match self.view {
                View::Week => self.handle_week_key(code).await,
                View::Approvals => self.handle_approvals_key(code).await,
                View::Recurring => self.handle_recurring_key(code).await,
                View::Points => {}
            },
        }
    }

    async fn handle_week_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left | KeyCode::Char('h') => self.select_day(self.day_offset(-1)),
            KeyCode::Right | KeyCode::Char('l') => self.select_day(self.day_offset(1)),
            KeyCode::Char('[') => self.shift_week(false).await,
            KeyCode::Char(']') => self.shift_week(true).await,
            KeyCode::Char('t') => self.goto_today().await,
            KeyCode::Char(' ') | KeyCode::Enter => self.start_complete(),
            KeyCode::Char('a') => self.start_add(),
            KeyCode::Char('e') => self.start_edit(InputField::Title),
            KeyCode::Char('p') => self.start_edit(InputField::Points),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected().await,
            _ => {}
        }
    }

    async fn handle_approvals_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Enter => self.approve_selected().await,
            KeyCode::Char('n') | KeyCode::Char('x') => self.reject_selected().await,
            _ => {}
        }
    }

    async fn handle_recurring_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('a') => self.start_add(),
            KeyCode::Char('e') => self.start_edit(InputField::Title),
            KeyCode::Char('p') => self.start_edit(InputField::Points),
            KeyCode::Char('w') => self.start_edit(InputField::Day),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected().await,
            _ => {}
        }
    }

    pub async fn switch_view(&mut self, view: View) {
        self.view = view;
        if view == View::Points {
            if let Err(e) = self.workflow.load_history().await {
                self.report(e);
            }
            let board = self.workflow.board();
            self.history = board.points_history();
            self.overall = board.overall_points();
        }
        self.reload();
    }

    /// Selects the next row of the current view.
    pub fn next(&mut self) {
        let (state, len) = self.current_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous row of the current view.
    pub fn previous(&mut self) {
        let (state, len) = self.current_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn select_day(&mut self, day: Day) {
        self.day = day;
        self.state.select(None);
        self.reload();
    }

    fn day_offset(&self, delta: i32) -> Day {
        let len = Day::ALL.len() as i32;
        let i = Day::ALL.iter().position(|d| *d == self.day).unwrap_or(0) as i32;
        Day::ALL[(i + delta).rem_euclid(len) as usize]
    }

    async fn shift_week(&mut self, forward: bool) {
        let week = self.workflow.board().week();
        let target = if forward { week.next() } else { week.previous() };
        if let Some(target) = target {
            self.change_week(target).await;
        }
    }

    async fn goto_today(&mut self) {
        self.day = calendar::today();
        self.change_week(WeekKey::current()).await;
    }

    async fn change_week(&mut self, week: WeekKey) {
        match self.workflow.change_week(week).await {
            Ok(()) => self.status = Some(Status::Info(format!("Week {}", week))),
            Err(e) => self.report(e),
        }
        self.reload();
    }

    fn start_complete(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        match task.state() {
            TaskState::Virtual | TaskState::Open => {
                self.target_id = Some(task.id.clone());
                self.input_mode = InputMode::ChoosingParticipant;
            }
            state => {
                self.status = Some(Status::Info(format!("'{}' is already {}", task.title, state)));
            }
        }
    }

    async fn complete_selected(&mut self, participant: usize) {
        let Some(id) = self.target_id.take() else {
            return;
        };
        let Some(child) = self.workflow.board().roster().get(participant).cloned() else {
            self.status = Some(Status::Error("No such participant".into()));
            return;
        };
        match self.workflow.complete(&id, &child).await {
            Ok(task) => {
                self.status = Some(Status::Info(format!(
                    "'{}' sent for approval ({} pts to {})",
                    task.title, task.points, child
                )))
            }
            Err(e) => self.report(e),
        }
        self.reload();
    }

    async fn approve_selected(&mut self) {
        let Some(id) = self.selected_approval_id() else {
            return;
        };
        match self.workflow.approve(&id).await {
            Ok(Some(celebration)) => self.status = Some(Status::Celebrate(celebration)),
            Ok(None) => self.status = Some(Status::Info("Already handled".into())),
            Err(e) => self.report(e),
        }
        self.reload();
    }

    async fn reject_selected(&mut self) {
        let Some(id) = self.selected_approval_id() else {
            return;
        };
        match self.workflow.reject(&id).await {
            Ok(Some(task)) => {
                self.status = Some(Status::Info(format!("'{}' is open again", task.title)))
            }
            Ok(None) => self.status = Some(Status::Info("Already handled".into())),
            Err(e) => self.report(e),
        }
        self.reload();
    }

    /// Deletes the selected task or recurring task.
    pub async fn delete_selected(&mut self) {
        let result = match self.view {
            View::Week => match self.selected_task() {
                Some(task) => self.workflow.delete_task(&task.id).await.map(|t| t.title),
                None => return,
            },
            View::Recurring => match self.selected_template() {
                Some(template) => self
                    .workflow
                    .delete_recurring(&template.id)
                    .await
                    .map(|_| template.title),
                None => return,
            },
            _ => return,
        };
        match result {
            Ok(title) => self.status = Some(Status::Info(format!("Deleted '{}'", title))),
            Err(e) => self.report(e),
        }
        self.reload();
    }

    /// Initiates the add wizard for the current view.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of one field of the selected task or template.
    pub fn start_edit(&mut self, field: InputField) {
        let (id, title, points, day) = match self.view {
            View::Week => match self.selected_task() {
                Some(t) if t.state() == TaskState::Open => (t.id, t.title, t.points, t.day),
                Some(t) => {
                    self.status = Some(Status::Info(format!(
                        "Only open tasks can be edited ('{}' is {})",
                        t.title,
                        t.state()
                    )));
                    return;
                }
                None => return,
            },
            View::Recurring => match self.selected_template() {
                Some(r) => (r.id, r.title, r.points, r.day),
                None => return,
            },
            _ => return,
        };
        self.target_id = Some(id);
        self.input_mode = InputMode::Editing;
        self.input_field = field;
        self.input_buffer = match field {
            InputField::Title => title,
            InputField::Points => points.to_string(),
            InputField::Day => day.to_string(),
            InputField::None => String::new(),
        };
    }

    /// Handles text input based on the current mode.
    pub async fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input().await,
            InputMode::Editing => self.handle_editing_input().await,
            _ => {}
        }
    }

    async fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => {
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = self.input_buffer.trim().to_string();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => match parse_points(&self.input_buffer) {
                Ok(points) => {
                    self.add_state.points = Some(points);
                    self.input_buffer.clear();
                    if self.view == View::Recurring {
                        self.add_state.step += 1;
                        self.input_buffer = self.day.to_string();
                    } else {
                        self.finish_add(self.day).await;
                    }
                }
                Err(e) => self.report(e),
            },
            2 => match self.input_buffer.parse::<Day>() {
                Ok(day) => self.finish_add(day).await,
                Err(e) => self.report(e),
            },
            _ => {}
        }
    }

    async fn finish_add(&mut self, day: Day) {
        let title = std::mem::take(&mut self.add_state.title);
        let points = self.add_state.points.unwrap_or(1);
        let result = if self.view == View::Recurring {
            self.workflow
                .create_recurring(&title, points, day)
                .await
                .map(|r| format!("Recurring '{}' added for {}", r.title, r.day))
        } else {
            self.workflow
                .create_task(&title, points, day)
                .await
                .map(|t| format!("Added '{}'", t.title))
        };
        match result {
            Ok(msg) => self.status = Some(Status::Info(msg)),
            Err(e) => self.report(e),
        }
        self.cancel_input();
        self.reload();
    }

    async fn handle_editing_input(&mut self) {
        let Some(id) = self.target_id.clone() else {
            self.cancel_input();
            return;
        };
        let result = match self.view {
            View::Week => self.edit_task(&id).await,
            View::Recurring => self.edit_template(&id).await,
            _ => Ok(()),
        };
        match result {
            Ok(()) => self.status = Some(Status::Info("Saved".into())),
            Err(e) => {
                warn!(%id, error = %e, "edit failed");
                self.report(e);
            }
        }
        self.cancel_input();
        self.reload();
    }

    async fn edit_task(&mut self, id: &str) -> Result<()> {
        let task = self
            .workflow
            .board()
            .find_task(id)
            .ok_or_else(|| Error::not_found("task", id))?;
        let (title, points) = match self.input_field {
            InputField::Title => (self.input_buffer.clone(), task.points),
            InputField::Points => (task.title, parse_points(&self.input_buffer)?),
            _ => return Ok(()),
        };
        self.workflow.edit_task(id, &title, points).await.map(|_| ())
    }

    async fn edit_template(&mut self, id: &str) -> Result<()> {
        let update = match self.input_field {
            InputField::Title => RecurringUpdate::new(Some(self.input_buffer.as_str()), None, None)?,
            InputField::Points => {
                RecurringUpdate::new(None, Some(parse_points(&self.input_buffer)?), None)?
            }
            InputField::Day => RecurringUpdate::new(None, None, Some(self.input_buffer.parse()?))?,
            InputField::None => return Ok(()),
        };
        self.workflow.update_recurring(id, &update).await.map(|_| ())
    }

    fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
        self.target_id = None;
        self.add_state = AddState::default();
    }

    fn report(&mut self, e: Error) {
        self.status = Some(Status::Error(e.to_string()));
    }

    fn current_table(&mut self) -> (&mut TableState, usize) {
        match self.view {
            View::Week | View::Points => (&mut self.state, self.tasks.len()),
            View::Approvals => (&mut self.approval_state, self.pending.len()),
            View::Recurring => (&mut self.template_state, self.templates.len()),
        }
    }

    fn selected_task(&self) -> Option<Task> {
        self.state.selected().and_then(|i| self.tasks.get(i)).cloned()
    }

    fn selected_approval_id(&self) -> Option<String> {
        self.approval_state
            .selected()
            .and_then(|i| self.pending.get(i))
            .map(|a| a.id.clone())
    }

    fn selected_template(&self) -> Option<RecurringTask> {
        self.template_state
            .selected()
            .and_then(|i| self.templates.get(i))
            .cloned()
    }
}

fn parse_points(input: &str) -> Result<u8> {
    input
        .trim()
        .parse::<u8>()
        .map_err(|_| Error::InvalidArgument(format!("'{}' is not a point value", input.trim())))
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
