use serde::{Deserialize, Serialize};
use skirmish_core::UnitId;

/// Stable handle of a task owned by the [`TaskHandler`](crate::TaskHandler).
///
/// Handles are never reused within one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Slot priority on a unit. Higher slots preempt lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl TaskPriority {
    /// Highest first.
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::Low => write!(f, "low"),
        }
    }
}

/// Outcome reported by [`Task::execute`](crate::Task::execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Executing,
    Completed,
    /// Failed without side effects worth reporting, e.g. a precondition did not hold.
    FailedClean,
    /// Failed after external state changed or was interrupted.
    FailedUnexpected,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Executing)
    }
}

/// Identifier handed out to external listeners that observe tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(pub u32);

/// Party notified when a task reaches a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observer {
    Unit(UnitId),
    Task(TaskId),
    Listener(ListenerId),
}

/// Terminal status addressed to a [`Observer::Listener`], collected in the
/// handler's outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub listener: ListenerId,
    pub task: TaskId,
    pub status: Status,
}
