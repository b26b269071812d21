use std::any::Any;

use skirmish_core::{Command, CommandError, EventKind, GameEvent, UnitId, World};

use crate::handler::TaskHandler;
use crate::types::{Observer, Status, TaskId, TaskPriority};

/// Access to the concrete type behind a `dyn Task`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A long-lived, interruptible activity driven by the [`TaskHandler`].
///
/// `execute` is called at most once per scheduling turn while the task is
/// active. Tasks must not block; anything that takes game time is expressed
/// by returning [`Status::Executing`] and checking again next turn.
pub trait Task: AsAny {
    /// Short type name used for logging, metrics and [`TaskHandler::nr_of_tasks`].
    fn kind(&self) -> &'static str;

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status;

    /// Stop producing external side effects until resumed.
    fn halt(&mut self, ctx: &mut TaskContext<'_>);

    /// Re-establish whatever external state `halt` suspended.
    fn resume(&mut self, ctx: &mut TaskContext<'_>);

    /// Called when a task this one observes reaches a terminal status.
    fn on_task_finished(&mut self, _ctx: &mut TaskContext<'_>, _finished: TaskId, _status: Status) {}

    /// Event kinds routed to [`Task::on_event`] while the task is tracked.
    fn subscriptions(&self) -> &[EventKind] {
        &[]
    }

    fn on_event(&mut self, _ctx: &mut TaskContext<'_>, _event: &GameEvent) {}

    /// Called when the task is force-removed, before observers are notified.
    fn cancel(&mut self, _ctx: &mut TaskContext<'_>) {}
}

/// What a task hook can reach: the handler that owns it and the world.
pub struct TaskContext<'a> {
    pub handler: &'a mut TaskHandler,
    pub world: &'a mut dyn World,
    id: TaskId,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(handler: &'a mut TaskHandler, world: &'a mut dyn World, id: TaskId) -> Self {
        Self { handler, world, id }
    }

    /// Id of the task whose hook is running.
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn command(&mut self, unit: UnitId, command: Command) -> Result<(), CommandError> {
        self.world.command(unit, command)
    }

    /// Insert and run `task` with the calling task as its observer.
    pub fn spawn_child(&mut self, task: Box<dyn Task>) -> TaskId {
        let observer = Observer::Task(self.id);
        self.handler.spawn(task, Some(observer))
    }

    /// Insert `task` and run it bound to `unit` with the calling task as
    /// observer. Returns `None` and drops the task if the unit refuses it.
    pub fn spawn_child_on_unit(
        &mut self,
        task: Box<dyn Task>,
        unit: UnitId,
        priority: TaskPriority,
    ) -> Option<TaskId> {
        let id = self.handler.insert(task);
        let observer = Some(Observer::Task(self.id));
        if self.handler.run_on_unit(&mut *self.world, id, observer, unit, priority) {
            Some(id)
        } else {
            self.handler.discard(id);
            None
        }
    }

    pub fn remove(&mut self, task: TaskId) -> bool {
        self.handler.remove(&mut *self.world, task)
    }

    pub fn halt(&mut self, task: TaskId) -> bool {
        self.handler.halt(&mut *self.world, task)
    }

    pub fn resume(&mut self, task: TaskId) -> bool {
        self.handler.resume(&mut *self.world, task)
    }

    /// Detach `unit` from the calling task.
    pub fn unbind(&mut self, unit: UnitId) -> bool {
        let id = self.id;
        self.handler.unbind_task(&mut *self.world, id, unit)
    }
}
