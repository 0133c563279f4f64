//! weekchores - weekly chore board for a household
//!
//! Tasks are organised by (year, week, day). Children complete them, a
//! parent approves or rejects, and approved (or awaiting) points add up per
//! child for the week. Recurring templates project one task onto every
//! week until someone completes it.
//!
//! # Module Organization
//!
//! - `models`: tasks, templates, approval queue records, days, participants
//! - `calendar`: ISO (year, week) keys
//! - `hierarchy`: year > week > task store
//! - `recurrence`: projection of recurring templates onto a week
//! - `ledger`: point totals derived from tasks and the approval queue
//! - `gateway`: persistence contract and snapshot events
//! - `storage`: JSON-file implementation of the gateway
//! - `board`: the in-process state the workflow operates on
//! - `workflow`: completion / approval state machine
//! - `config`: configuration loading from `config.toml`
//! - `commands`: CLI commands
//! - `tui`: interactive terminal UI

pub mod board;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hierarchy;
pub mod ledger;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod tui;
pub mod workflow;

pub use error::{Error, Result};
