use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs},
    Frame,
};

use super::app::{App, InputField, InputMode, Status, View};
use crate::gateway::PersistenceGateway;
use crate::models::{Day, TaskState};

pub fn ui<G: PersistenceGateway>(f: &mut Frame, app: &mut App<G>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);
    match app.view {
        View::Week => render_week(f, app, chunks[1]),
        View::Approvals => render_approvals(f, app, chunks[1]),
        View::Recurring => render_recurring(f, app, chunks[1]),
        View::Points => render_points(f, app, chunks[1]),
    }
    render_status(f, app, chunks[2]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view {
            View::Week => "q: Quit | Tab: View | h/l: Day | j/k: Select | Space: Done | a: Add | e: Title | p: Points | d: Del | [/]: Week | t: Today",
            View::Approvals => "q: Quit | Tab: View | j/k: Select | y: Approve | n: Reject",
            View::Recurring => "q: Quit | Tab: View | j/k: Select | a: Add | e: Title | p: Points | w: Day | d: Del",
            View::Points => "q: Quit | Tab: View",
        },
        InputMode::ChoosingParticipant => "1-9: Who did it | Esc: Cancel",
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);

    match app.input_mode {
        InputMode::Editing | InputMode::Adding => render_input(f, app),
        InputMode::ChoosingParticipant => render_participants(f, app),
        InputMode::Normal => {}
    }
}

fn render_tabs<G: PersistenceGateway>(f: &mut Frame, app: &App<G>, area: Rect) {
    let badge = app.workflow.board().approvals_badge();
    let titles: Vec<Line> = View::ALL
        .iter()
        .map(|v| match v {
            View::Week => Line::from("Week"),
            View::Approvals if badge > 0 => Line::from(format!("Approvals ({})", badge)),
            View::Approvals => Line::from("Approvals"),
            View::Recurring => Line::from("Recurring"),
            View::Points => Line::from("Points"),
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.view.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Weekchores - {}", app.workflow.board().week())),
        )
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn render_week<G: PersistenceGateway>(f: &mut Frame, app: &mut App<G>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(area);

    let board = app.workflow.board();
    let days: Vec<ListItem> = Day::ALL
        .iter()
        .map(|d| {
            let style = if *d == app.day {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            ListItem::new(format!("{:<8} {:>3}p", d.label(), board.day_points(*d))).style(style)
        })
        .collect();
    let totals: Vec<String> = board
        .ledger()
        .totals()
        .map(|(p, t)| format!("{} {}", p, t))
        .collect();
    let days = List::new(days).block(
        Block::default()
            .borders(Borders::ALL)
            .title(totals.join(" | ")),
    );
    f.render_widget(days, chunks[0]);

    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let state = t.state();
            let by = t
                .completed_by
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default();
            let recurring = if board.is_recurring(t) { "↻" } else { "" };
            Row::new(vec![
                Cell::from(t.title.clone()),
                Cell::from(t.points.to_string()),
                Cell::from(state.to_string()),
                Cell::from(by),
                Cell::from(recurring),
            ])
            .style(Style::default().fg(state_color(state)))
        })
        .collect();

    let widths = [
        Constraint::Min(20),
        Constraint::Length(4),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(3),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Task", "Pts", "Status", "By", ""])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(app.day.label()))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, chunks[1], &mut app.state);
}

fn render_approvals<G: PersistenceGateway>(f: &mut Frame, app: &mut App<G>, area: Rect) {
    let rows: Vec<Row> = app
        .pending
        .iter()
        .map(|a| {
            Row::new(vec![
                Cell::from(a.title.clone()),
                Cell::from(a.points.to_string()),
                Cell::from(a.child.to_string()),
                Cell::from(
                    a.completed_at
                        .with_timezone(&chrono::Local)
                        .format("%a %H:%M")
                        .to_string(),
                ),
            ])
        })
        .collect();
    let widths = [
        Constraint::Min(20),
        Constraint::Length(4),
        Constraint::Length(12),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Task", "Pts", "Child", "Done"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Waiting for approval"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.approval_state);
}

fn render_recurring<G: PersistenceGateway>(f: &mut Frame, app: &mut App<G>, area: Rect) {
    let rows: Vec<Row> = app
        .templates
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.title.clone()),
                Cell::from(r.points.to_string()),
                Cell::from(r.day.label()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Min(20),
        Constraint::Length(4),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Task", "Pts", "Day"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Every week"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.template_state);
}

fn render_points<G: PersistenceGateway>(f: &mut Frame, app: &App<G>, area: Rect) {
    let roster = app.workflow.board().roster();
    let mut header = vec!["Week".to_string()];
    header.extend(roster.iter().map(|p| p.to_string()));

    let mut rows: Vec<Row> = app
        .history
        .iter()
        .map(|w| {
            let mut cells = vec![Cell::from(w.week.to_string())];
            cells.extend(roster.iter().map(|p| Cell::from(w.ledger.total(p).to_string())));
            Row::new(cells)
        })
        .collect();
    let mut total = vec![Cell::from("All")];
    total.extend(roster.iter().map(|p| Cell::from(app.overall.total(p).to_string())));
    rows.push(Row::new(total).style(Style::default().add_modifier(Modifier::BOLD)));

    let mut widths = vec![Constraint::Length(10)];
    widths.extend(roster.iter().map(|_| Constraint::Length(10)));
    let table = Table::new(rows, widths)
        .header(
            Row::new(header)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Approved points"));
    f.render_widget(table, area);
}

fn render_status<G: PersistenceGateway>(f: &mut Frame, app: &App<G>, area: Rect) {
    let (text, style) = match &app.status {
        Some(Status::Info(msg)) => (msg.clone(), Style::default().fg(Color::Gray)),
        Some(Status::Celebrate(c)) => (
            format!("★ {} earned {} points for '{}'! ★", c.participant, c.points, c.title),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Some(Status::Error(msg)) => (format!("Error: {}", msg), Style::default().fg(Color::Red)),
        None => (String::new(), Style::default()),
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input<G: PersistenceGateway>(f: &mut Frame, app: &App<G>) {
    let area = centered_rect(60, 3, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_mode {
        InputMode::Adding => match (app.view, app.add_state.step) {
            (View::Recurring, 0) => "Add Recurring: Enter Title",
            (View::Recurring, 1) => "Add Recurring: Enter Points (1-5)",
            (View::Recurring, _) => "Add Recurring: Enter Day",
            (_, 0) => "Add Task: Enter Title",
            _ => "Add Task: Enter Points (1-5)",
        },
        _ => match app.input_field {
            InputField::Title => "Edit Title",
            InputField::Points => "Edit Points (1-5)",
            InputField::Day => "Edit Day",
            InputField::None => "Edit",
        },
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

fn render_participants<G: PersistenceGateway>(f: &mut Frame, app: &App<G>) {
    let roster = app.workflow.board().roster();
    let height = roster.len() as u16 + 2;
    let area = centered_rect(40, height, f.area());
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = roster
        .iter()
        .enumerate()
        .map(|(i, p)| ListItem::new(format!("{}: {}", i + 1, p)))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Who did it?"));
    f.render_widget(list, area);
}

fn state_color(state: TaskState) -> Color {
    match state {
        TaskState::Virtual => Color::Cyan,
        TaskState::Open => Color::White,
        TaskState::Pending => Color::Yellow,
        TaskState::Approved => Color::Green,
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
