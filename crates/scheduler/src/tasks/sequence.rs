use std::collections::VecDeque;

use skirmish_core::UnitId;
use tracing::debug;

use crate::task::{Task, TaskContext};
use crate::types::{Status, TaskId, TaskPriority};

/// Runs child tasks one after another, whatever status each ends with.
pub struct SequenceTask {
    pending: VecDeque<Box<dyn Task>>,
    current: Option<TaskId>,
    /// Children are bound to this unit slot when set.
    unit: Option<(UnitId, TaskPriority)>,
    results: Vec<Status>,
}

impl SequenceTask {
    pub const KIND: &'static str = "sequence";

    pub fn new(children: Vec<Box<dyn Task>>) -> Self {
        Self {
            pending: children.into(),
            current: None,
            unit: None,
            results: Vec::new(),
        }
    }

    /// Run every child on `unit` at `priority`.
    pub fn on_unit(children: Vec<Box<dyn Task>>, unit: UnitId, priority: TaskPriority) -> Self {
        Self {
            unit: Some((unit, priority)),
            ..Self::new(children)
        }
    }

    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Terminal status of every child that has run, in order.
    pub fn results(&self) -> &[Status] {
        &self.results
    }

    fn start_next(&mut self, ctx: &mut TaskContext<'_>) {
        while let Some(child) = self.pending.pop_front() {
            let kind = child.kind();
            let started = match self.unit {
                Some((unit, priority)) => ctx.spawn_child_on_unit(child, unit, priority),
                None => Some(ctx.spawn_child(child)),
            };
            match started {
                Some(id) => {
                    debug!(sequence = %ctx.id(), child = %id, kind, "sequence step started");
                    self.current = Some(id);
                    return;
                }
                None => {
                    debug!(sequence = %ctx.id(), kind, "sequence step refused");
                    self.results.push(Status::FailedClean);
                }
            }
        }
    }
}

impl Task for SequenceTask {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        if self.current.is_some() {
            return Status::Executing;
        }
        if self.pending.is_empty() {
            return Status::Completed;
        }
        self.start_next(ctx);
        if self.current.is_some() {
            Status::Executing
        } else {
            Status::Completed
        }
    }

    fn halt(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(child) = self.current {
            ctx.halt(child);
        }
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(child) = self.current {
            ctx.resume(child);
        }
    }

    fn on_task_finished(&mut self, _ctx: &mut TaskContext<'_>, finished: TaskId, status: Status) {
        // The next child starts on the next turn, once the finished one has
        // left its unit slot.
        if self.current == Some(finished) {
            self.current = None;
            self.results.push(status);
        }
    }

    fn cancel(&mut self, ctx: &mut TaskContext<'_>) {
        self.pending.clear();
        if let Some(child) = self.current.take() {
            ctx.remove(child);
        }
    }
}
