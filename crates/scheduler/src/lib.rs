//! Cooperative, time-sliced task scheduling for game agents.
//!
//! Tasks are owned by a [`TaskHandler`] and addressed by [`TaskId`]. Each
//! call to [`TaskHandler::update`] spends a share of the elapsed game time
//! on the active tasks, and terminal statuses are relayed to every observer.
//! Units hold tasks in priority slots through [`TaskUnit`]; a higher
//! priority task halts the lower one until it finishes.

pub mod error;
pub mod handler;
pub mod metrics;
pub mod registry;
pub mod task;
pub mod tasks;
pub mod types;
pub mod unit;

pub use error::{Result, SchedulerError};
pub use handler::TaskHandler;
pub use metrics::SchedulerMetrics;
pub use registry::TaskUnitHandler;
pub use task::{AsAny, Task, TaskContext};
pub use types::{ListenerId, Notification, Observer, Status, TaskId, TaskPriority};
pub use unit::{SlotAction, TaskInformation, TaskUnit, UnitProfile};
