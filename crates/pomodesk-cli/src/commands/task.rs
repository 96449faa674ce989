//! Task board commands for CLI.
//!
//! Every command works on one day's board (`--date`, default today). Task
//! ids are the numbers shown by `task list`.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Subcommand;
use pomodesk_core::task::DEFAULT_PRIORITY;
use pomodesk_core::{LogNotifier, TaskBoard, TaskId, TaskStatus};

use super::{date_arg, print_json, CmdResult, Workspace};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task in TODO
    Add {
        /// Task title
        title: String,
        /// Higher sorts first
        #[arg(long, default_value_t = DEFAULT_PRIORITY)]
        priority: i32,
        /// Day the task belongs to (YYYY-MM-DD)
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// List a day's tasks, highest priority first
    List {
        /// Only tasks in this status (todo, doing, done, undo)
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Per-status counts for a day
    Counts {
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Check a task forward: TODO -> DOING -> DONE, UNDO -> TODO
    Advance {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Move a task to a specific status
    Move {
        id: i64,
        /// Target status (todo, doing, done, undo)
        status: TaskStatus,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Cancel a task (to UNDO)
    Cancel {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Bring a cancelled task back to TODO
    Restore {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Cancel a task, or delete it if already cancelled
    Discard {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Change a task's title
    Rename {
        id: i64,
        title: String,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Permanently delete a cancelled task
    Remove {
        id: i64,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
}

fn open_board(ws: &Workspace, date: Option<NaiveDate>) -> Result<TaskBoard, Box<dyn std::error::Error>> {
    let mut board = TaskBoard::load(ws.db.clone(), Arc::new(LogNotifier), ws.clock.clone())?;
    if let Some(date) = date {
        board.select_date(date)?;
    }
    Ok(board)
}

pub fn run(action: TaskAction) -> CmdResult {
    let ws = Workspace::open()?;

    match action {
        TaskAction::Add {
            title,
            priority,
            date,
        } => {
            let mut board = open_board(&ws, None)?;
            let task = board.add_task(&title, ws.day(date), priority)?;
            print_json(&task)?;
        }
        TaskAction::List { status, date } => {
            let board = open_board(&ws, date)?;
            match status {
                Some(status) => print_json(&board.get_by_status(status))?,
                None => print_json(&board.tasks())?,
            }
        }
        TaskAction::Counts { date } => {
            let board = open_board(&ws, date)?;
            print_json(&board.counts())?;
        }
        TaskAction::Advance { id, date } => {
            let task = open_board(&ws, date)?.advance(TaskId(id))?;
            print_json(&task)?;
        }
        TaskAction::Move { id, status, date } => {
            let task = open_board(&ws, date)?.move_task(TaskId(id), status)?;
            print_json(&task)?;
        }
        TaskAction::Cancel { id, date } => {
            let task = open_board(&ws, date)?.cancel(TaskId(id))?;
            print_json(&task)?;
        }
        TaskAction::Restore { id, date } => {
            let task = open_board(&ws, date)?.restore(TaskId(id))?;
            print_json(&task)?;
        }
        TaskAction::Discard { id, date } => {
            let outcome = open_board(&ws, date)?.discard(TaskId(id))?;
            print_json(&serde_json::json!({ "id": id, "outcome": outcome }))?;
        }
        TaskAction::Rename { id, title, date } => {
            let task = open_board(&ws, date)?.rename_task(TaskId(id), &title)?;
            print_json(&task)?;
        }
        TaskAction::Remove { id, date } => {
            let task = open_board(&ws, date)?.remove_task(TaskId(id))?;
            println!("Task removed: {}", task.title);
        }
    }
    Ok(())
}
