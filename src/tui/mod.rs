pub mod app;
pub mod ui;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::error;

use crate::error::Result;
use crate::gateway::PersistenceGateway;
use crate::workflow::Workflow;
use app::App;
use ui::ui;

/// How long to wait for a key before refreshing from the gateway.
const TICK: Duration = Duration::from_millis(250);

pub async fn run_tui<G: PersistenceGateway>(workflow: Workflow<G>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(workflow);
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        error!(error = %e, "ui loop failed");
    }
    res
}

async fn run_app<B: Backend, G: PersistenceGateway>(
    terminal: &mut Terminal<B>,
    app: &mut App<G>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code).await;
                }
            }
        } else {
            app.on_tick().await;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
