mod support;

use crossterm::event::KeyCode;
use ratatui::{backend::TestBackend, Terminal};
use weekchores::models::TaskState;
use weekchores::tui::app::{App, InputMode, Status, View};
use weekchores::tui::ui::ui;

use support::{local_workflow, simon};

async fn type_text<G: weekchores::gateway::PersistenceGateway>(app: &mut App<G>, text: &str) {
    for c in text.chars() {
        app.handle_key(KeyCode::Char(c)).await;
    }
    app.handle_key(KeyCode::Enter).await;
}

#[tokio::test]
async fn test_add_complete_and_approve_from_keys() {
    let (_gw, wf) = local_workflow().await;
    let mut app = App::new(wf);

    app.handle_key(KeyCode::Char('a')).await;
    assert_eq!(app.input_mode, InputMode::Adding);
    type_text(&mut app, "Vacuum").await;
    type_text(&mut app, "3").await;
    assert_eq!(app.input_mode, InputMode::Normal);
    app.reload();
    assert_eq!(app.tasks.len(), 1);
    assert_eq!(app.tasks[0].day, app.day);

    app.handle_key(KeyCode::Char(' ')).await;
    assert_eq!(app.input_mode, InputMode::ChoosingParticipant);
    app.handle_key(KeyCode::Char('1')).await;
    assert_eq!(app.tasks[0].state(), TaskState::Pending);
    assert_eq!(app.workflow.board().ledger().total(&simon()), 3);

    app.handle_key(KeyCode::Tab).await;
    assert_eq!(app.view, View::Approvals);
    assert_eq!(app.pending.len(), 1);
    app.handle_key(KeyCode::Char('y')).await;
    assert!(matches!(app.status, Some(Status::Celebrate(_))));
    assert!(app.pending.is_empty());

    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    for _ in 0..4 {
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        app.handle_key(KeyCode::Tab).await;
    }
}

#[tokio::test]
async fn test_invalid_points_keep_wizard_open() {
    let (_gw, wf) = local_workflow().await;
    let mut app = App::new(wf);

    app.handle_key(KeyCode::Char('a')).await;
    type_text(&mut app, "Vacuum").await;
    type_text(&mut app, "9").await;
    assert!(matches!(app.status, Some(Status::Error(_))));
    assert!(app.tasks.is_empty());

    app.handle_key(KeyCode::Esc).await;
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[tokio::test]
async fn test_recurring_view_adds_template() {
    let (_gw, wf) = local_workflow().await;
    let mut app = App::new(wf);
    app.switch_view(View::Recurring).await;

    app.handle_key(KeyCode::Char('a')).await;
    type_text(&mut app, "Dishes").await;
    type_text(&mut app, "2").await;
    // Day defaults to the selected day; replace it
    for _ in 0..10 {
        app.handle_key(KeyCode::Backspace).await;
    }
    type_text(&mut app, "tirsdag").await;

    assert_eq!(app.templates.len(), 1);
    assert_eq!(app.templates[0].points, 2);
}
