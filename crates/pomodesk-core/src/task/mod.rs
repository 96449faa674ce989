//! Day-partitioned tasks and their four-state workflow.

mod board;

pub use board::{Discarded, TaskBoard};

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default priority for tasks created without one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Store-assigned task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task workflow state.
///
/// ```text
///   TODO ──advance──> DOING ──advance──> DONE
///    ^                  |                  |
///    | restore          | cancel           | cancel
///    |                  v                  v
///   UNDO <──────────────+──────────────────+
///    |
///    +──delete──> (removed)
/// ```
///
/// Valid transitions:
/// - TODO → DOING
/// - DOING → DONE (stamps `completed_at`)
/// - UNDO → TODO
/// - TODO | DOING | DONE → UNDO
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
    /// Cancelled. The only state a task can be deleted from.
    Undo,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::Doing,
        TaskStatus::Done,
        TaskStatus::Undo,
    ];

    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &TaskStatus) -> bool {
        match self {
            TaskStatus::Todo => matches!(to, TaskStatus::Doing | TaskStatus::Undo),
            TaskStatus::Doing => matches!(to, TaskStatus::Done | TaskStatus::Undo),
            TaskStatus::Done => matches!(to, TaskStatus::Undo),
            TaskStatus::Undo => matches!(to, TaskStatus::Todo),
        }
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &[TaskStatus] {
        match self {
            TaskStatus::Todo => &[TaskStatus::Doing, TaskStatus::Undo],
            TaskStatus::Doing => &[TaskStatus::Done, TaskStatus::Undo],
            TaskStatus::Done => &[TaskStatus::Undo],
            TaskStatus::Undo => &[TaskStatus::Todo],
        }
    }

    /// Target of the forward "check" action, if the state has one.
    pub fn advance_target(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Todo => Some(TaskStatus::Doing),
            TaskStatus::Doing => Some(TaskStatus::Done),
            TaskStatus::Undo => Some(TaskStatus::Todo),
            TaskStatus::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Doing => "DOING",
            TaskStatus::Done => "DONE",
            TaskStatus::Undo => "UNDO",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "DOING" => Ok(TaskStatus::Doing),
            "DONE" => Ok(TaskStatus::Done),
            "UNDO" | "CANCELLED" => Ok(TaskStatus::Undo),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A to-do item belonging to one day.
///
/// `completed_at` is set exactly when `status` is `Done`; `date` never
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<TaskId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
    pub priority: i32,
    pub date: NaiveDate,
}

impl Task {
    pub fn new(title: impl Into<String>, date: NaiveDate, priority: i32, now: DateTime<Local>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            created_at: now,
            completed_at: None,
            priority,
            date,
        }
    }

    /// Set the status and keep `completed_at` in step with it. No
    /// transition check; see [`TaskStatus::can_transition_to`].
    pub(crate) fn set_status(&mut self, status: TaskStatus, now: DateTime<Local>) {
        self.status = status;
        self.completed_at = (status == TaskStatus::Done).then_some(now);
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tasks_default_to_todo() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn transition_table() {
        use TaskStatus::*;
        let allowed = [
            (Todo, Doing),
            (Doing, Done),
            (Undo, Todo),
            (Todo, Undo),
            (Doing, Undo),
            (Done, Undo),
        ];
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn valid_transitions_agree_with_table() {
        for from in TaskStatus::ALL {
            for to in from.valid_transitions() {
                assert!(from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn advance_targets() {
        assert_eq!(TaskStatus::Todo.advance_target(), Some(TaskStatus::Doing));
        assert_eq!(TaskStatus::Doing.advance_target(), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::Undo.advance_target(), Some(TaskStatus::Todo));
        assert_eq!(TaskStatus::Done.advance_target(), None);
    }

    #[test]
    fn status_strings() {
        assert_eq!("doing".parse::<TaskStatus>().unwrap(), TaskStatus::Doing);
        assert_eq!("UNDO".parse::<TaskStatus>().unwrap(), TaskStatus::Undo);
        assert!("pending".parse::<TaskStatus>().is_err());
        assert_eq!(
            serde_json::to_value(TaskStatus::Done).unwrap(),
            serde_json::json!("DONE")
        );
    }

    #[test]
    fn set_status_tracks_completion() {
        let now = Local::now();
        let mut task = Task::new("write", now.date_naive(), 1, now);
        task.set_status(TaskStatus::Done, now);
        assert_eq!(task.completed_at, Some(now));
        task.set_status(TaskStatus::Undo, now);
        assert_eq!(task.completed_at, None);
    }
}
