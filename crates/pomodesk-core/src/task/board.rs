//! Per-day task board.
//!
//! The board holds the tasks of the active date in display order (priority
//! descending, newest first). Every mutation is written through the gateway
//! before the in-memory copy changes: a failed write leaves the board as it
//! was and returns the error.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Task, TaskId, TaskStatus};
use crate::clock::Clock;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::notify::{dispatch, Notifier};
use crate::stats::TaskStats;
use crate::storage::PersistenceGateway;

/// What a discard action did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discarded {
    /// Moved to `Undo`.
    Cancelled,
    /// Was already in `Undo` and is now gone.
    Removed,
}

pub struct TaskBoard {
    gateway: Arc<dyn PersistenceGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    active_date: NaiveDate,
    tasks: Vec<Task>,
}

impl std::fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("active_date", &self.active_date)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

fn display_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

impl TaskBoard {
    /// Open the board on today's date.
    pub fn load(
        gateway: Arc<dyn PersistenceGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let today = clock.today();
        let mut board = Self {
            gateway,
            notifier,
            clock,
            active_date: today,
            tasks: Vec::new(),
        };
        board.select_date(today)?;
        Ok(board)
    }

    pub fn active_date(&self) -> NaiveDate {
        self.active_date
    }

    /// All tasks of the active date in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == Some(id))
    }

    /// Replace the working set with the tasks stored for `date`.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        let mut tasks = self.gateway.list_tasks_by_date(date)?;
        tasks.sort_by(display_order);
        info!(%date, count = tasks.len(), "task board loaded");
        self.active_date = date;
        self.tasks = tasks;
        Ok(())
    }

    /// Create a `Todo` task on `date`.
    ///
    /// The task joins the in-memory set only when `date` is the active
    /// date; otherwise it is stored and shows up when that day is selected.
    pub fn add_task(&mut self, title: &str, date: NaiveDate, priority: i32) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("task title".into()).into());
        }
        let mut task = Task::new(title, date, priority, self.clock.now());
        let id = self.gateway.save_task(&task)?;
        task.id = Some(id);
        debug!(task = %id, %date, "task added");

        if date == self.active_date {
            self.tasks.push(task.clone());
            self.tasks.sort_by(display_order);
        }
        Ok(task)
    }

    /// Ordered tasks of the active date with the given status.
    pub fn get_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// The only status mutator. Validates against the workflow table and
    /// persists before committing to memory.
    pub fn move_task(&mut self, id: TaskId, to: TaskStatus) -> Result<Task> {
        let idx = self.index_of(id)?;
        let from = self.tasks[idx].status;
        if !from.can_transition_to(&to) {
            return Err(CoreError::InvalidTransition { from, to });
        }

        let now = self.clock.now();
        let mut updated = self.tasks[idx].clone();
        updated.set_status(to, now);
        self.gateway.save_task(&updated)?;
        self.tasks[idx] = updated.clone();

        debug!(task = %id, %from, %to, "task moved");
        dispatch(
            self.notifier.as_ref(),
            &Event::TaskTransitioned {
                task_id: id,
                from,
                to,
                at: now,
            },
        );
        Ok(updated)
    }

    /// Forward action: Todo → Doing → Done, and Undo → Todo.
    pub fn advance(&mut self, id: TaskId) -> Result<Task> {
        let from = self.tasks[self.index_of(id)?].status;
        let to = from
            .advance_target()
            .ok_or(CoreError::InvalidTransition { from, to: from })?;
        self.move_task(id, to)
    }

    pub fn cancel(&mut self, id: TaskId) -> Result<Task> {
        self.move_task(id, TaskStatus::Undo)
    }

    pub fn restore(&mut self, id: TaskId) -> Result<Task> {
        self.move_task(id, TaskStatus::Todo)
    }

    /// Delete action: a cancelled task is removed for good, anything else
    /// is cancelled.
    pub fn discard(&mut self, id: TaskId) -> Result<Discarded> {
        let status = self.tasks[self.index_of(id)?].status;
        if status == TaskStatus::Undo {
            self.remove_task(id)?;
            Ok(Discarded::Removed)
        } else {
            self.cancel(id)?;
            Ok(Discarded::Cancelled)
        }
    }

    /// Permanently delete a task. Only `Undo` tasks may be deleted.
    pub fn remove_task(&mut self, id: TaskId) -> Result<Task> {
        let idx = self.index_of(id)?;
        let status = self.tasks[idx].status;
        if status != TaskStatus::Undo {
            return Err(CoreError::DeleteNotAllowed(status));
        }
        self.gateway.delete_task(id)?;
        let removed = self.tasks.remove(idx);
        debug!(task = %id, "task removed");
        dispatch(
            self.notifier.as_ref(),
            &Event::TaskRemoved {
                task_id: id,
                at: self.clock.now(),
            },
        );
        Ok(removed)
    }

    /// Change a task's title.
    pub fn rename_task(&mut self, id: TaskId, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("task title".into()).into());
        }
        let idx = self.index_of(id)?;
        let mut updated = self.tasks[idx].clone();
        updated.title = title.to_string();
        self.gateway.save_task(&updated)?;
        self.tasks[idx] = updated.clone();
        Ok(updated)
    }

    /// Per-status counts for the active date.
    pub fn counts(&self) -> TaskStats {
        let mut stats = TaskStats::default();
        for task in &self.tasks {
            stats.add(task.status);
        }
        stats
    }

    fn index_of(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == Some(id))
            .ok_or_else(|| CoreError::NotFound(format!("task {id} on {}", self.active_date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{ChannelNotifier, NullNotifier};
    use crate::storage::Database;
    use chrono::{Local, TimeZone};
    use proptest::prelude::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn board_with(clock: Arc<ManualClock>) -> TaskBoard {
        let db = Arc::new(Database::open_in_memory().unwrap());
        TaskBoard::load(db, Arc::new(NullNotifier), clock).unwrap()
    }

    fn board() -> TaskBoard {
        board_with(clock())
    }

    #[test]
    fn add_task_starts_in_todo() {
        let mut b = board();
        let today = b.active_date();
        let task = b.add_task("write report", today, 1).unwrap();
        assert!(task.id.is_some());
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.completed_at, None);
        assert_eq!(b.get_by_status(TaskStatus::Todo).len(), 1);
    }

    #[test]
    fn add_task_rejects_blank_title() {
        let mut b = board();
        let today = b.active_date();
        assert!(matches!(
            b.add_task("   ", today, 1),
            Err(CoreError::Validation(_))
        ));
        assert!(b.tasks().is_empty());
    }

    #[test]
    fn add_task_for_other_day_is_stored_not_shown() {
        let mut b = board();
        let tomorrow = b.active_date().succ_opt().unwrap();
        b.add_task("later", tomorrow, 1).unwrap();
        assert!(b.tasks().is_empty());
        b.select_date(tomorrow).unwrap();
        assert_eq!(b.tasks().len(), 1);
        assert_eq!(b.tasks()[0].title, "later");
    }

    #[test]
    fn doing_to_done_stamps_completion() {
        let c = clock();
        let mut b = board_with(Arc::clone(&c));
        let today = b.active_date();
        let id = b.add_task("ship", today, 1).unwrap().id.unwrap();
        b.move_task(id, TaskStatus::Doing).unwrap();

        c.advance(chrono::Duration::minutes(30));
        let done = b.move_task(id, TaskStatus::Done).unwrap();
        assert_eq!(done.completed_at, Some(c.now()));
        assert_eq!(b.get_by_status(TaskStatus::Done).len(), 1);
        assert!(b.get_by_status(TaskStatus::Doing).is_empty());
    }

    #[test]
    fn todo_to_done_is_rejected_and_unchanged() {
        let mut b = board();
        let today = b.active_date();
        let id = b.add_task("skip ahead", today, 1).unwrap().id.unwrap();
        let before = b.get(id).unwrap().clone();
        let err = b.move_task(id, TaskStatus::Done).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: TaskStatus::Todo,
                to: TaskStatus::Done
            }
        ));
        assert_eq!(b.get(id).unwrap(), &before);
    }

    #[test]
    fn remove_requires_undo() {
        let mut b = board();
        let today = b.active_date();
        let id = b.add_task("keep", today, 1).unwrap().id.unwrap();
        assert!(matches!(
            b.remove_task(id),
            Err(CoreError::DeleteNotAllowed(TaskStatus::Todo))
        ));
        assert!(b.get(id).is_some());

        b.cancel(id).unwrap();
        b.remove_task(id).unwrap();
        assert!(b.get(id).is_none());
        b.select_date(today).unwrap();
        assert!(b.tasks().is_empty(), "deleted from the store too");
    }

    #[test]
    fn discard_cancels_then_removes() {
        let mut b = board();
        let today = b.active_date();
        let id = b.add_task("maybe", today, 1).unwrap().id.unwrap();
        assert_eq!(b.discard(id).unwrap(), Discarded::Cancelled);
        assert_eq!(b.get(id).unwrap().status, TaskStatus::Undo);
        assert_eq!(b.discard(id).unwrap(), Discarded::Removed);
        assert!(b.get(id).is_none());
    }

    #[test]
    fn advance_walks_the_workflow() {
        let mut b = board();
        let today = b.active_date();
        let id = b.add_task("walk", today, 1).unwrap().id.unwrap();
        assert_eq!(b.advance(id).unwrap().status, TaskStatus::Doing);
        assert_eq!(b.advance(id).unwrap().status, TaskStatus::Done);
        assert!(matches!(
            b.advance(id),
            Err(CoreError::InvalidTransition { .. })
        ));
        b.cancel(id).unwrap();
        assert_eq!(b.get(id).unwrap().completed_at, None);
        assert_eq!(b.advance(id).unwrap().status, TaskStatus::Todo);
    }

    #[test]
    fn order_is_priority_then_newest() {
        let c = clock();
        let mut b = board_with(Arc::clone(&c));
        let today = b.active_date();
        b.add_task("low old", today, 1).unwrap();
        c.advance(chrono::Duration::minutes(1));
        b.add_task("high", today, 5).unwrap();
        c.advance(chrono::Duration::minutes(1));
        b.add_task("low new", today, 1).unwrap();

        let titles: Vec<String> = b
            .get_by_status(TaskStatus::Todo)
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, vec!["high", "low new", "low old"]);

        b.select_date(today).unwrap();
        let reloaded: Vec<String> = b.tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(reloaded, titles);
    }

    #[test]
    fn same_instant_ties_match_store_order() {
        let mut b = board();
        let today = b.active_date();
        b.add_task("first", today, 1).unwrap();
        b.add_task("second", today, 1).unwrap();

        let in_memory: Vec<String> = b
            .get_by_status(TaskStatus::Todo)
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(in_memory, vec!["second", "first"]);

        b.select_date(today).unwrap();
        let reloaded: Vec<String> = b
            .get_by_status(TaskStatus::Todo)
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(reloaded, in_memory);
    }

    #[test]
    fn rename_persists() {
        let mut b = board();
        let today = b.active_date();
        let id = b.add_task("draft", today, 1).unwrap().id.unwrap();
        b.rename_task(id, "final").unwrap();
        b.select_date(today).unwrap();
        assert_eq!(b.get(id).unwrap().title, "final");
    }

    #[test]
    fn transitions_are_announced() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (notifier, mut rx) = ChannelNotifier::new();
        let mut b = TaskBoard::load(db, Arc::new(notifier), clock()).unwrap();
        let today = b.active_date();
        let id = b.add_task("tell", today, 1).unwrap().id.unwrap();
        b.advance(id).unwrap();
        match rx.try_recv().unwrap() {
            Event::TaskTransitioned { task_id, from, to, .. } => {
                assert_eq!(task_id, id);
                assert_eq!(from, TaskStatus::Todo);
                assert_eq!(to, TaskStatus::Doing);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn counts_by_status() {
        let mut b = board();
        let today = b.active_date();
        let a = b.add_task("a", today, 1).unwrap().id.unwrap();
        b.add_task("b", today, 1).unwrap();
        b.advance(a).unwrap();
        let counts = b.counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.todo_count, 1);
        assert_eq!(counts.doing_count, 1);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let mut b = board();
        assert!(matches!(
            b.move_task(TaskId(404), TaskStatus::Doing),
            Err(CoreError::NotFound(_))
        ));
    }

    fn status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Todo),
            Just(TaskStatus::Doing),
            Just(TaskStatus::Done),
            Just(TaskStatus::Undo),
        ]
    }

    proptest! {
        #[test]
        fn done_iff_completed_at(moves in proptest::collection::vec(status(), 0..30)) {
            let mut b = board();
            let today = b.active_date();
            let id = b.add_task("p", today, 1).unwrap().id.unwrap();
            for to in moves {
                let before = b.get(id).unwrap().clone();
                match b.move_task(id, to) {
                    Ok(_) => prop_assert!(before.status.can_transition_to(&to)),
                    Err(_) => prop_assert_eq!(b.get(id).unwrap(), &before),
                }
                let task = b.get(id).unwrap();
                prop_assert_eq!(task.status == TaskStatus::Done, task.completed_at.is_some());
            }
        }
    }
}
