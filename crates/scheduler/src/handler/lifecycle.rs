use skirmish_core::{UnitId, World};
use tracing::{debug, error, warn};

use super::core::{Deferred, EntryState, TaskHandler};
use crate::task::Task;
use crate::types::{Notification, Observer, Status, TaskId, TaskPriority};
use crate::unit::SlotAction;

impl TaskHandler {
    /// Insert and run `task`.
    pub fn spawn(&mut self, task: Box<dyn Task>, observer: Option<Observer>) -> TaskId {
        let id = self.insert(task);
        self.run(id, observer);
        id
    }

    fn is_runnable(&self, id: TaskId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| !e.removed && e.state == EntryState::Idle)
    }

    /// Start tracking an inserted task as active.
    ///
    /// Fails without side effects if the task is unknown or already active
    /// or halted.
    pub fn run(&mut self, id: TaskId, observer: Option<Observer>) -> bool {
        if !self.is_runnable(id) {
            return false;
        }
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if let Some(observer) = observer {
            entry.observers.push(observer);
        }
        entry.state = EntryState::Active;
        entry.status = Status::Executing;
        let kind = entry.kind;
        let subscriptions = entry
            .task
            .as_ref()
            .map(|t| t.subscriptions().to_vec())
            .unwrap_or_default();

        self.active.push(id);
        if !subscriptions.is_empty() {
            self.events.subscribe(id, &subscriptions);
        }
        debug!(task = %id, kind, active = self.active.len(), "task started");
        true
    }

    /// Run a task bound to `unit` in the slot for `priority`.
    ///
    /// Fails without side effects if the task cannot run, the unit is
    /// unknown or destroyed, or the slot is taken. On success the unit
    /// observes the task and preemption is applied.
    pub fn run_on_unit(
        &mut self,
        world: &mut dyn World,
        id: TaskId,
        observer: Option<Observer>,
        unit: UnitId,
        priority: TaskPriority,
    ) -> bool {
        if !self.is_runnable(id) {
            return false;
        }
        match self.units.get(unit) {
            None => {
                warn!(task = %id, unit = %unit, "run on unknown unit");
                return false;
            }
            Some(u) if u.is_destroyed() || u.task(priority).is_some() => return false,
            Some(_) => {}
        }

        self.run(id, observer);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.observers.push(Observer::Unit(unit));
            entry.priority = Some(priority);
        }
        let actions = match self.units.get_mut(unit).map(|u| u.set_task(id, priority)) {
            Some(Ok(actions)) => actions,
            Some(Err(err)) => {
                error!(task = %id, unit = %unit, %err, "failed to set task on unit");
                Vec::new()
            }
            None => Vec::new(),
        };
        for action in actions {
            self.apply_slot_action(world, action);
        }
        true
    }

    /// Run a task bound to every unit in `units` through their high-level
    /// slots. All units are checked before anything is bound.
    pub fn run_high_level(
        &mut self,
        id: TaskId,
        observer: Option<Observer>,
        units: &[UnitId],
        priority: TaskPriority,
    ) -> bool {
        if !self.is_runnable(id) {
            return false;
        }
        let mut bound: Vec<UnitId> = Vec::with_capacity(units.len());
        for unit in units {
            if bound.contains(unit) {
                continue;
            }
            match self.units.get(*unit) {
                Some(u) if !u.is_destroyed() && u.high_level_task().is_none() => bound.push(*unit),
                _ => {
                    debug!(task = %id, unit = %unit, "unit cannot take a high-level task");
                    return false;
                }
            }
        }

        self.run(id, observer);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.priority = Some(priority);
            entry.observers.extend(bound.iter().map(|u| Observer::Unit(*u)));
        }
        for unit in &bound {
            if let Some(Err(err)) = self.units.get_mut(*unit).map(|u| u.set_high_level_task(id)) {
                error!(task = %id, unit = %unit, %err, "failed to set high-level task");
            }
        }
        true
    }

    /// Force-remove an active or halted task.
    ///
    /// The task is cancelled and every observer is told it failed
    /// unexpectedly, unless the terminal status was already delivered.
    pub fn remove(&mut self, world: &mut dyn World, id: TaskId) -> bool {
        if !self.is_tracked(id) {
            return false;
        }
        self.unlink(id);
        self.metrics.removals += 1;
        debug!(task = %id, kind = self.kind(id).unwrap_or("?"), "removing task");

        self.call_or_defer(world, id, Deferred::Cancel);
        self.notify_observers(world, id, Status::FailedUnexpected);
        self.release(id);
        true
    }

    /// Move an active task to the halted set and call its `halt` hook.
    pub fn halt(&mut self, world: &mut dyn World, id: TaskId) -> bool {
        if self.state(id) != Some(EntryState::Active) {
            return false;
        }
        self.active.retain(|t| *t != id);
        self.halted.push(id);
        self.recently_halted.insert(id);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = EntryState::Halted;
        }
        self.metrics.halts += 1;
        debug!(
            task = %id,
            active = self.active.len(),
            halted = self.halted.len(),
            "task halted"
        );
        self.call_or_defer(world, id, Deferred::Halt);
        true
    }

    /// Move a halted task back to the end of the active list and call its
    /// `resume` hook.
    pub fn resume(&mut self, world: &mut dyn World, id: TaskId) -> bool {
        if self.state(id) != Some(EntryState::Halted) {
            return false;
        }
        self.halted.retain(|t| *t != id);
        self.active.push(id);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = EntryState::Active;
        }
        self.metrics.resumes += 1;
        debug!(
            task = %id,
            active = self.active.len(),
            halted = self.halted.len(),
            "task resumed"
        );
        self.call_or_defer(world, id, Deferred::Resume);
        true
    }

    /// Add `unit` as an observer of a running task and place the task in
    /// the unit's high-level slot.
    pub fn bind_task(&mut self, id: TaskId, unit: UnitId) -> bool {
        if !self.is_tracked(id) {
            return false;
        }
        let Some(task_unit) = self.units.get_mut(unit) else {
            return false;
        };
        if task_unit.high_level_task() != Some(id) && task_unit.set_high_level_task(id).is_err() {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            let observer = Observer::Unit(unit);
            if !entry.observers.contains(&observer) {
                entry.observers.push(observer);
            }
        }
        true
    }

    /// Detach `unit` from a running task. The unit alone is told the task
    /// failed unexpectedly.
    pub fn unbind_task(&mut self, world: &mut dyn World, id: TaskId, unit: UnitId) -> bool {
        if !self.is_tracked(id) {
            return false;
        }
        let observer = Observer::Unit(unit);
        let found = match self.entries.get_mut(&id) {
            Some(entry) => {
                let before = entry.observers.len();
                entry.observers.retain(|o| *o != observer);
                entry.observers.len() != before
            }
            None => false,
        };
        if found {
            self.notify(world, observer, id, Status::FailedUnexpected);
        }
        found
    }

    /// Deliver a terminal status to every observer of `id`, once.
    pub(super) fn notify_observers(&mut self, world: &mut dyn World, id: TaskId, status: Status) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.notified {
            return;
        }
        entry.notified = true;
        entry.status = status;
        let observers = entry.observers.clone();
        let kind = entry.kind;
        self.metrics.record_finished(kind);
        debug!(task = %id, kind, ?status, observers = observers.len(), "task finished");

        for observer in observers {
            self.notify(world, observer, id, status);
        }
    }

    fn notify(&mut self, world: &mut dyn World, observer: Observer, finished: TaskId, status: Status) {
        self.metrics.notifications += 1;
        match observer {
            Observer::Unit(unit) => {
                let action = self
                    .units
                    .get_mut(unit)
                    .and_then(|u| u.on_task_finished(finished));
                if let Some(action) = action {
                    self.apply_slot_action(world, action);
                }
            }
            Observer::Task(task) => {
                if self.is_tracked(task) {
                    self.call_or_defer(world, task, Deferred::Notify { finished, status });
                }
            }
            Observer::Listener(listener) => self.outbox.push(Notification {
                listener,
                task: finished,
                status,
            }),
        }
    }

    fn apply_slot_action(&mut self, world: &mut dyn World, action: SlotAction) {
        match action {
            SlotAction::Halt(task) => {
                self.halt(world, task);
            }
            SlotAction::Resume(task) => {
                self.resume(world, task);
            }
        }
    }
}
