use std::io::{self, Write};

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::calendar;
use crate::error::{Error, Result};
use crate::gateway::PersistenceGateway;
use crate::ledger::Ledger;
use crate::models::{Day, Participant, RecurringUpdate, Task, TaskState, VIRTUAL_ID_PREFIX};
use crate::workflow::Workflow;

/// Adds a task to the current week. Defaults to today's day.
pub async fn cmd_add<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    title: String,
    points: u8,
    day: Option<String>,
) -> Result<()> {
    let day = parse_day_or_today(day.as_deref())?;
    let task = wf.create_task(&title, points, day).await?;
    println!("Task added (id = {})", short_id(&task.id));
    Ok(())
}

/// Lists the current week, or one day of it, in display order.
pub fn cmd_list<G: PersistenceGateway>(wf: &Workflow<G>, day: Option<String>) -> Result<()> {
    let board = wf.board();
    let days = match day {
        Some(d) => vec![d.parse::<Day>()?],
        None => Day::ALL.to_vec(),
    };
    let tasks: Vec<Task> = days.iter().flat_map(|d| board.tasks_for_day(*d)).collect();

    println!("Week {}", board.week());
    if tasks.is_empty() {
        println!("No tasks found.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Day").add_attribute(Attribute::Bold),
                Cell::new("Title").add_attribute(Attribute::Bold),
                Cell::new("Pts").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
                Cell::new("By").add_attribute(Attribute::Bold),
                Cell::new("Recurring").add_attribute(Attribute::Bold),
            ]);

        for t in &tasks {
            let state = t.state();
            table.add_row(vec![
                Cell::new(short_id(&t.id)),
                Cell::new(t.day),
                Cell::new(&t.title),
                Cell::new(t.points),
                Cell::new(state).fg(state_color(state)),
                Cell::new(
                    t.completed_by
                        .as_ref()
                        .map(Participant::to_string)
                        .unwrap_or_default(),
                ),
                Cell::new(if board.is_recurring(t) { "yes" } else { "" }),
            ]);
        }
        println!("{table}");
    }

    print_ledger(board.ledger());
    println!("Waiting for approval: {}", board.approvals_badge());
    Ok(())
}

/// Completes a task (open or recurring projection) on behalf of `by`.
pub async fn cmd_complete<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    id: String,
    by: String,
) -> Result<()> {
    let participant = Participant::parse(&by)?;
    let id = wf.board().resolve_task_id(&id)?;
    let task = wf.complete(&id, &participant).await?;
    println!(
        "'{}' completed by {} ({} pts), waiting for approval.",
        task.title, participant, task.points
    );
    Ok(())
}

/// Lists the approval queue.
pub fn cmd_approvals<G: PersistenceGateway>(wf: &Workflow<G>) -> Result<()> {
    let pending = wf.board().pending();
    if pending.is_empty() {
        println!("Nothing waiting for approval.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Task", "Pts", "Child", "Completed"]);
    for a in pending {
        table.add_row(vec![
            short_id(&a.id).to_string(),
            a.title.clone(),
            a.points.to_string(),
            a.child.to_string(),
            a.completed_at
                .with_timezone(&chrono::Local)
                .format("%a %H:%M")
                .to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn cmd_approve<G: PersistenceGateway>(wf: &mut Workflow<G>, id: String) -> Result<()> {
    let id = wf.board().resolve_approval_id(&id).unwrap_or(id);
    match wf.approve(&id).await? {
        Some(c) => println!(
            "Approved '{}': {} earned {} pts!",
            c.title, c.participant, c.points
        ),
        None => eprintln!("Nothing to approve for {}.", id),
    }
    Ok(())
}

pub async fn cmd_reject<G: PersistenceGateway>(wf: &mut Workflow<G>, id: String) -> Result<()> {
    let id = wf.board().resolve_approval_id(&id).unwrap_or(id);
    match wf.reject(&id).await? {
        Some(task) => println!("Rejected '{}', it is open again.", task.title),
        None => eprintln!("Nothing to reject for {}.", id),
    }
    Ok(())
}

/// Edits title and/or points of an open task.
pub async fn cmd_edit<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    id: String,
    title: Option<String>,
    points: Option<u8>,
) -> Result<()> {
    let id = wf.board().resolve_task_id(&id)?;
    let current = wf
        .board()
        .find_task(&id)
        .ok_or_else(|| Error::not_found("task", &id))?;
    let title = title.unwrap_or(current.title);
    let points = points.unwrap_or(current.points);
    let task = wf.edit_task(&id, &title, points).await?;
    println!("Task {} updated.", short_id(&task.id));
    Ok(())
}

pub async fn cmd_remove<G: PersistenceGateway>(wf: &mut Workflow<G>, id: String) -> Result<()> {
    let id = wf.board().resolve_task_id(&id)?;
    let task = wf.delete_task(&id).await?;
    println!("Task '{}' removed.", task.title);
    Ok(())
}

/// Shows this week's totals, or per-week history with `history`.
pub async fn cmd_points<G: PersistenceGateway>(wf: &mut Workflow<G>, history: bool) -> Result<()> {
    if !history {
        println!("Week {}", wf.board().week());
        print_ledger(wf.board().ledger());
        return Ok(());
    }

    wf.load_history().await?;
    let board = wf.board();
    let weeks = board.points_history();
    if weeks.is_empty() {
        println!("No approved points yet.");
        return Ok(());
    }

    let roster = board.roster();
    let mut header = vec![Cell::new("Week").add_attribute(Attribute::Bold)];
    header.extend(roster.iter().map(|p| Cell::new(p).add_attribute(Attribute::Bold)));
    header.push(Cell::new("Total").add_attribute(Attribute::Bold));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header);
    for w in &weeks {
        let mut row = vec![Cell::new(w.week)];
        row.extend(roster.iter().map(|p| Cell::new(w.ledger.total(p))));
        row.push(Cell::new(w.ledger.sum()));
        table.add_row(row);
    }
    let overall = board.overall_points();
    let mut row = vec![Cell::new("All").add_attribute(Attribute::Bold)];
    row.extend(
        roster
            .iter()
            .map(|p| Cell::new(overall.total(p)).add_attribute(Attribute::Bold)),
    );
    row.push(Cell::new(overall.sum()).add_attribute(Attribute::Bold));
    table.add_row(row);
    println!("{table}");
    Ok(())
}

pub async fn cmd_recurring_add<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    title: String,
    points: u8,
    day: String,
) -> Result<()> {
    let day: Day = day.parse()?;
    let template = wf.create_recurring(&title, points, day).await?;
    println!(
        "Recurring task '{}' added for every {} (id = {}).",
        template.title,
        template.day,
        short_id(&template.id)
    );
    Ok(())
}

pub fn cmd_recurring_list<G: PersistenceGateway>(wf: &Workflow<G>) -> Result<()> {
    let templates = wf.board().templates();
    if templates.is_empty() {
        println!("No recurring tasks found.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Title", "Pts", "Day"]);
    for t in templates {
        table.add_row(vec![
            short_id(&t.id).to_string(),
            t.title.clone(),
            t.points.to_string(),
            t.day.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn cmd_recurring_edit<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    id: String,
    title: Option<String>,
    points: Option<u8>,
    day: Option<String>,
) -> Result<()> {
    let id = wf.board().resolve_template_id(&id)?;
    let day = day.map(|d| d.parse::<Day>()).transpose()?;
    let update = RecurringUpdate::new(title.as_deref(), points, day)?;
    if update.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    let template = wf.update_recurring(&id, &update).await?;
    println!("Recurring task '{}' updated.", template.title);
    Ok(())
}

pub async fn cmd_recurring_remove<G: PersistenceGateway>(
    wf: &mut Workflow<G>,
    id: String,
) -> Result<()> {
    let id = wf.board().resolve_template_id(&id)?;
    wf.delete_recurring(&id).await?;
    println!("Recurring task {} removed.", short_id(&id));
    Ok(())
}

/// Runs the weekly reset for the current week after confirmation.
pub async fn cmd_reset<G: PersistenceGateway>(wf: &mut Workflow<G>, force: bool) -> Result<()> {
    if !force {
        print!(
            "Reset week {}? Points go to zero and every task is reopened. [y/N] ",
            wf.board().week()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let summary = wf.weekly_reset().await?;
    println!(
        "Week reset: {} tasks reopened, {} approvals cleared, {} recurring tasks added.",
        summary.reopened, summary.cleared_approvals, summary.materialized
    );
    Ok(())
}

/// Display form of an id: eight characters, after the prefix for
/// recurring projections.
pub fn short_id(id: &str) -> &str {
    let keep = if id.starts_with(VIRTUAL_ID_PREFIX) {
        VIRTUAL_ID_PREFIX.len() + 8
    } else {
        8
    };
    match id.char_indices().nth(keep) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn parse_day_or_today(day: Option<&str>) -> Result<Day> {
    match day {
        Some(d) => d.parse(),
        None => Ok(calendar::today()),
    }
}

fn print_ledger(ledger: &Ledger) {
    let line: Vec<String> = ledger
        .totals()
        .map(|(p, total)| format!("{}: {} pts", p, total))
        .collect();
    println!("{}", line.join("  |  "));
}

fn state_color(state: TaskState) -> Color {
    match state {
        TaskState::Virtual => Color::Cyan,
        TaskState::Open => Color::Yellow,
        TaskState::Pending => Color::Magenta,
        TaskState::Approved => Color::Green,
    }
}
