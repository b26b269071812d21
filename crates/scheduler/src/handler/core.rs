use std::collections::{HashMap, HashSet, VecDeque};

use skirmish_core::tuning::SchedulerTuning;
use skirmish_core::{EventBus, GameEvent, World};
use tracing::{debug, trace};

use crate::metrics::SchedulerMetrics;
use crate::registry::TaskUnitHandler;
use crate::task::{Task, TaskContext};
use crate::types::{ListenerId, Notification, Observer, Status, TaskId, TaskPriority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EntryState {
    /// Inserted but not running, or already unlinked.
    Idle,
    Active,
    Halted,
}

/// Hook call queued while the target task was checked out.
#[derive(Debug, Clone)]
pub(super) enum Deferred {
    Halt,
    Resume,
    Cancel,
    Notify { finished: TaskId, status: Status },
    Event(GameEvent),
}

pub(super) struct Entry {
    /// `None` while one of the task's hooks is running.
    pub(super) task: Option<Box<dyn Task>>,
    pub(super) kind: &'static str,
    pub(super) state: EntryState,
    pub(super) status: Status,
    pub(super) observers: Vec<Observer>,
    pub(super) priority: Option<TaskPriority>,
    /// Observers already received the terminal status.
    pub(super) notified: bool,
    /// Released while checked out; dropped at check-in.
    pub(super) removed: bool,
    pub(super) deferred: VecDeque<Deferred>,
}

impl Entry {
    fn new(task: Box<dyn Task>) -> Self {
        Self {
            kind: task.kind(),
            task: Some(task),
            state: EntryState::Idle,
            status: Status::Executing,
            observers: Vec::new(),
            priority: None,
            notified: false,
            removed: false,
            deferred: VecDeque::new(),
        }
    }

    pub(super) fn is_tracked(&self) -> bool {
        !self.removed && self.state != EntryState::Idle
    }
}

/// Owns every task and the unit registry, and drives execution.
///
/// Tasks are addressed by [`TaskId`]. While one of a task's hooks runs the
/// task is checked out of its entry; hook calls aimed at it in the meantime
/// are queued and delivered in order once it is checked back in.
pub struct TaskHandler {
    pub(super) entries: HashMap<TaskId, Entry>,
    pub(super) next_id: u32,
    pub(super) next_listener: u32,
    /// Canonical execution order.
    pub(super) active: Vec<TaskId>,
    pub(super) halted: Vec<TaskId>,
    /// Halted since the current pass started.
    pub(super) recently_halted: HashSet<TaskId>,
    /// Active list captured at the start of the current pass.
    pub(super) snapshot: Vec<TaskId>,
    pub(super) cursor: usize,
    pub(super) accumulator: f64,
    pub(super) per_task: f64,
    pub(super) split_load_time: f64,
    pub(super) units: TaskUnitHandler,
    pub(super) events: EventBus<TaskId>,
    pub(super) outbox: Vec<Notification>,
    pub(super) metrics: SchedulerMetrics,
}

impl TaskHandler {
    pub fn new(tuning: &SchedulerTuning) -> Self {
        Self::with_split_load_time(tuning.task_split_load_time)
    }

    /// `split_load_time` is the game time one full pass over the active
    /// tasks should take.
    pub fn with_split_load_time(split_load_time: f64) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            next_listener: 1,
            active: Vec::new(),
            halted: Vec::new(),
            recently_halted: HashSet::new(),
            snapshot: Vec::new(),
            cursor: 0,
            accumulator: 0.0,
            per_task: 0.0,
            split_load_time,
            units: TaskUnitHandler::new(),
            events: EventBus::new(),
            outbox: Vec::new(),
            metrics: SchedulerMetrics::default(),
        }
    }

    /// Take ownership of `task` without running it.
    pub fn insert(&mut self, task: Box<dyn Task>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        trace!(task = %id, kind = task.kind(), "task inserted");
        self.entries.insert(id, Entry::new(task));
        id
    }

    /// Drop a task that was inserted but never run. Returns false for
    /// unknown or tracked tasks.
    pub fn discard(&mut self, id: TaskId) -> bool {
        match self.entries.get(&id) {
            Some(entry) if entry.state == EntryState::Idle && !entry.removed => {
                self.release(id);
                true
            }
            _ => false,
        }
    }

    pub fn register_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    /// Terminal statuses addressed to listeners since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub fn units(&self) -> &TaskUnitHandler {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut TaskUnitHandler {
        &mut self.units
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.get(&id).is_some_and(|e| !e.removed)
    }

    /// Latest status reported by the task.
    pub fn status(&self, id: TaskId) -> Option<Status> {
        self.entries.get(&id).filter(|e| !e.removed).map(|e| e.status)
    }

    pub fn kind(&self, id: TaskId) -> Option<&'static str> {
        self.entries.get(&id).filter(|e| !e.removed).map(|e| e.kind)
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.state(id) == Some(EntryState::Active)
    }

    pub fn is_halted(&self, id: TaskId) -> bool {
        self.state(id) == Some(EntryState::Halted)
    }

    /// Active or halted.
    pub fn is_tracked(&self, id: TaskId) -> bool {
        self.entries.get(&id).is_some_and(Entry::is_tracked)
    }

    pub(super) fn state(&self, id: TaskId) -> Option<EntryState> {
        self.entries.get(&id).filter(|e| !e.removed).map(|e| e.state)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn halted_len(&self) -> usize {
        self.halted.len()
    }

    pub fn active_tasks(&self) -> &[TaskId] {
        &self.active
    }

    pub fn observers(&self, id: TaskId) -> Option<&[Observer]> {
        self.entries
            .get(&id)
            .filter(|e| !e.removed)
            .map(|e| e.observers.as_slice())
    }

    /// Priority the task was run with, if it was bound to units.
    pub fn task_priority(&self, id: TaskId) -> Option<TaskPriority> {
        self.entries.get(&id).and_then(|e| e.priority)
    }

    /// Number of active tasks of `kind`.
    pub fn nr_of_tasks(&self, kind: &str) -> usize {
        self.active
            .iter()
            .filter(|id| self.entries.get(id).is_some_and(|e| e.kind == kind))
            .count()
    }

    /// Borrow a task as its concrete type.
    pub fn task_ref<T: Task + 'static>(&self, id: TaskId) -> Option<&T> {
        let entry = self.entries.get(&id).filter(|e| !e.removed)?;
        entry.task.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Run `f` on a task with a context, as if one of its hooks was called.
    ///
    /// Returns `None` if the task is unknown or currently checked out.
    pub fn with_task<R>(
        &mut self,
        world: &mut dyn World,
        id: TaskId,
        f: impl FnOnce(&mut dyn Task, &mut TaskContext<'_>) -> R,
    ) -> Option<R> {
        let entry = self.entries.get_mut(&id)?;
        if entry.removed {
            return None;
        }
        let mut task = entry.task.take()?;
        let result = {
            let mut ctx = TaskContext::new(self, &mut *world, id);
            f(task.as_mut(), &mut ctx)
        };
        self.check_in(world, id, task);
        Some(result)
    }

    /// Like [`TaskHandler::with_task`] for a task of concrete type `T`.
    pub fn with_task_as<T: Task + 'static, R>(
        &mut self,
        world: &mut dyn World,
        id: TaskId,
        f: impl FnOnce(&mut T, &mut TaskContext<'_>) -> R,
    ) -> Option<R> {
        self.with_task(world, id, |task, ctx| {
            task.as_any_mut().downcast_mut::<T>().map(|t| f(t, ctx))
        })
        .flatten()
    }

    fn check_in(&mut self, world: &mut dyn World, id: TaskId, task: Box<dyn Task>) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.task = Some(task);

        if entry.removed {
            let cancel = entry
                .deferred
                .iter()
                .any(|d| matches!(d, Deferred::Cancel));
            entry.deferred.clear();
            if cancel {
                entry.removed = false;
                self.with_task(world, id, |t, ctx| t.cancel(ctx));
            }
            trace!(task = %id, "dropping released task");
            self.entries.remove(&id);
            return;
        }

        while let Some(op) = self
            .entries
            .get_mut(&id)
            .filter(|e| e.task.is_some() && !e.removed)
            .and_then(|e| e.deferred.pop_front())
        {
            self.apply(world, id, op);
        }
    }

    /// Call the hook now, or queue it if the task is checked out.
    pub(super) fn call_or_defer(&mut self, world: &mut dyn World, id: TaskId, op: Deferred) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.task.is_none() {
            trace!(task = %id, ?op, "deferring hook");
            entry.deferred.push_back(op);
            return;
        }
        self.apply(world, id, op);
    }

    fn apply(&mut self, world: &mut dyn World, id: TaskId, op: Deferred) {
        match op {
            Deferred::Halt => {
                self.with_task(world, id, |t, ctx| t.halt(ctx));
            }
            Deferred::Resume => {
                self.with_task(world, id, |t, ctx| t.resume(ctx));
            }
            Deferred::Cancel => {
                self.with_task(world, id, |t, ctx| t.cancel(ctx));
            }
            Deferred::Notify { finished, status } => {
                self.with_task(world, id, |t, ctx| t.on_task_finished(ctx, finished, status));
            }
            Deferred::Event(event) => {
                self.with_task(world, id, |t, ctx| t.on_event(ctx, &event));
            }
        }
    }

    /// Remove `id` from whichever list holds it.
    pub(super) fn unlink(&mut self, id: TaskId) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        match entry.state {
            EntryState::Active => self.active.retain(|t| *t != id),
            EntryState::Halted => self.halted.retain(|t| *t != id),
            EntryState::Idle => {}
        }
        entry.state = EntryState::Idle;
        self.recently_halted.remove(&id);
    }

    /// Unlink and free the entry. A checked-out task is dropped when its
    /// hook returns.
    pub(super) fn release(&mut self, id: TaskId) {
        self.unlink(id);
        self.events.unsubscribe(&id);
        match self.entries.get_mut(&id) {
            Some(entry) if entry.task.is_none() => entry.removed = true,
            Some(_) => {
                self.entries.remove(&id);
            }
            None => {}
        }
        debug!(task = %id, "task released");
    }
}
