//! # Weekchores
//!
//! A weekly chore board for the terminal. Parents put up tasks worth 1-5
//! points on the days of the week, the kids mark them done, and every
//! completion waits for a parent's approval before it counts for good.
//!
//! ## Features
//!
//! *   **Weekly board**: Tasks live in ISO weeks, seven days each.
//! *   **Approval queue**: Completed tasks wait in a queue; approve to keep
//!     the points, reject to reopen the task and take them back.
//! *   **Recurring tasks**: Define a task once and it shows up every week.
//! *   **Weekly reset**: On the first run of a new week every task is
//!     reopened, the queue is cleared and the totals start from zero.
//! *   **Dual Interface**: Scriptable CLI and an interactive TUI.
//!
//! ## Usage
//!
//! ```bash
//! weekchores                          # interactive UI
//! weekchores add "Vaske opp" --points 2 --day mandag
//! weekchores list --day mandag
//! weekchores complete <ID> --by Simon
//! weekchores approvals
//! weekchores approve <ID>
//! weekchores reject <ID>
//! weekchores recurring add "Støvsuge" --points 3 --day lørdag
//! weekchores points --history
//! ```
//!
//! IDs can be shortened to any unique prefix.
//!
//! #### TUI Key Bindings
//!
//! *   `Tab`: Next view (Week, Approvals, Recurring, Points)
//! *   `h`/`l`: Previous/next day, `[`/`]`: previous/next week, `t`: today
//! *   `Space`: Complete selected task, then pick who did it
//! *   `y`/`n`: Approve/reject in the approvals view
//! *   `a`, `e`, `p`, `d`: Add, edit title, edit points, delete
//! *   `q`: Quit
//!
//! ## Data Storage
//!
//! Data is kept as JSON in the local data directory
//! (`~/.local/share/weekchores` on Linux). Override with
//! `WEEKCHORES_DATA_DIR` or `data_dir` in `config.toml`.
//!
//! ## Logging
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=weekchores=debug`). CLI commands log to
//! stderr; the TUI logs to `weekchores.log` in the data directory.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weekchores::board::Board;
use weekchores::calendar::WeekKey;
use weekchores::commands::*;
use weekchores::config::Config;
use weekchores::storage::LocalGateway;
use weekchores::tui::run_tui;
use weekchores::workflow::Workflow;
use weekchores::{Error, Result};

const LOG_FILE: &str = "weekchores.log";

#[derive(Parser)]
#[command(name = "weekchores")]
#[command(about = "Weekly chore board with points and parent approval", long_about = None)]
struct Cli {
    /// Path to config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Week to work on (YYYY-Www), defaults to the current week
    #[arg(short, long, global = true)]
    week: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the week
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Points, 1-5
        #[arg(short, long, default_value_t = 1)]
        points: u8,
        /// Day (mandag..søndag), defaults to today
        #[arg(short, long)]
        day: Option<String>,
    },
    /// List the week's tasks
    List {
        /// Only this day
        #[arg(short, long)]
        day: Option<String>,
    },
    /// Mark a task as done, pending approval
    Complete {
        id: String,
        /// Who did it
        #[arg(short, long)]
        by: String,
    },
    /// Show completions waiting for approval
    Approvals,
    /// Approve a pending completion
    Approve { id: String },
    /// Reject a pending completion and reopen the task
    Reject { id: String },
    /// Edit an open task
    Edit {
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New points
        #[arg(short, long)]
        points: Option<u8>,
    },
    /// Remove an open task
    Remove { id: String },
    /// Show point totals
    Points {
        /// Per-week history and overall totals
        #[arg(long)]
        history: bool,
    },
    /// Manage recurring tasks
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// Run the weekly reset now
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum RecurringCommands {
    /// Add a recurring task
    Add {
        title: String,
        #[arg(short, long, default_value_t = 1)]
        points: u8,
        /// Day it recurs on
        #[arg(short, long)]
        day: String,
    },
    /// List recurring tasks
    List,
    /// Edit a recurring task
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        points: Option<u8>,
        #[arg(short, long)]
        day: Option<String>,
    },
    /// Remove a recurring task
    Remove { id: String },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Ui);
    if let Commands::Completions { shell } = &command {
        return print_completions(shell);
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let data_dir = config.data_dir();
    let log_file = matches!(command, Commands::Ui).then(|| data_dir.join(LOG_FILE));
    init_tracing(&config.log_filter, &data_dir, log_file.as_deref())?;
    let week = cli.week.as_deref().map(str::parse::<WeekKey>).transpose()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let gateway = Arc::new(LocalGateway::open(&data_dir)?);
        debug!(dir = %data_dir.display(), "opened local store");
        let board = Board::new(config.roster()?, WeekKey::current());
        let mut wf = Workflow::new(gateway, board);
        wf.connect().await?;
        wf.check_weekly_reset(Local::now().date_naive()).await?;
        if let Some(week) = week {
            wf.change_week(week).await?;
        }
        dispatch(command, wf).await
    })
}

async fn dispatch(command: Commands, mut wf: Workflow<LocalGateway>) -> Result<()> {
    if let Commands::Ui = command {
        return run_tui(wf).await;
    }
    let wf = &mut wf;
    match command {
        Commands::Add { title, points, day } => cmd_add(wf, title, points, day).await,
        Commands::List { day } => cmd_list(wf, day),
        Commands::Complete { id, by } => cmd_complete(wf, id, by).await,
        Commands::Approvals => cmd_approvals(wf),
        Commands::Approve { id } => cmd_approve(wf, id).await,
        Commands::Reject { id } => cmd_reject(wf, id).await,
        Commands::Edit { id, title, points } => cmd_edit(wf, id, title, points).await,
        Commands::Remove { id } => cmd_remove(wf, id).await,
        Commands::Points { history } => cmd_points(wf, history).await,
        Commands::Recurring { command } => match command {
            RecurringCommands::Add { title, points, day } => {
                cmd_recurring_add(wf, title, points, day).await
            }
            RecurringCommands::List => cmd_recurring_list(wf),
            RecurringCommands::Edit {
                id,
                title,
                points,
                day,
            } => cmd_recurring_edit(wf, id, title, points, day).await,
            RecurringCommands::Remove { id } => cmd_recurring_remove(wf, id).await,
        },
        Commands::Reset { force } => cmd_reset(wf, force).await,
        Commands::Ui | Commands::Completions { .. } => Ok(()),
    }
}

fn print_completions(shell: &str) -> Result<()> {
    let shell_enum = match shell {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        "elvish" => Shell::Elvish,
        _ => return Err(Error::InvalidArgument(format!("Unsupported shell: {}", shell))),
    };
    let mut cmd = Cli::command();
    generate(shell_enum, &mut cmd, "weekchores", &mut io::stdout());
    Ok(())
}

/// `RUST_LOG` wins over the configured filter. With `log_file` set
/// (the TUI owns the terminal) events go to that file instead of stderr.
fn init_tracing(filter: &str, data_dir: &Path, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(path) => {
            fs::create_dir_all(data_dir)?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
    Ok(())
}
