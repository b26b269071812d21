//! Per-unit task slots with priority preemption.
//!
//! A [`TaskUnit`] never calls back into the handler. Preemption decisions are
//! returned as [`SlotAction`]s which the [`TaskHandler`](crate::TaskHandler)
//! applies.

use serde::Serialize;
use skirmish_core::{Position, UnitDef, UnitGroup, UnitId, World};
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::types::{TaskId, TaskPriority};

/// Follow-up the handler must perform after a slot change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    Halt(TaskId),
    Resume(TaskId),
}

/// Classification of a unit, fixed when it is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitProfile {
    pub def: String,
    pub groups: Vec<UnitGroup>,
    pub anti_air: bool,
    pub mobile: bool,
    pub flying: bool,
}

impl UnitProfile {
    pub fn in_group(&self, group: UnitGroup) -> bool {
        self.groups.contains(&group)
    }
}

impl From<&UnitDef> for UnitProfile {
    fn from(def: &UnitDef) -> Self {
        Self {
            def: def.name.clone(),
            groups: def.groups.clone(),
            anti_air: def.anti_air,
            mobile: def.mobile,
            flying: def.flying,
        }
    }
}

/// Slot contents of a unit, for logging and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskInformation {
    pub high_level: Option<TaskId>,
    pub high: Option<TaskId>,
    pub medium: Option<TaskId>,
    pub low: Option<TaskId>,
}

impl std::fmt::Display for TaskInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn slot(t: Option<TaskId>) -> String {
            t.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "high-level: {}, high: {}, medium: {}, low: {}",
            slot(self.high_level),
            slot(self.high),
            slot(self.medium),
            slot(self.low)
        )
    }
}

/// One owned unit and the tasks bound to it.
#[derive(Debug, Clone)]
pub struct TaskUnit {
    id: UnitId,
    live: Option<UnitId>,
    profile: UnitProfile,
    slots: [Option<TaskId>; 3],
    high_level: Option<TaskId>,
}

impl TaskUnit {
    pub fn new(id: UnitId, profile: UnitProfile) -> Self {
        Self {
            id,
            live: Some(id),
            profile,
            slots: [None; 3],
            high_level: None,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn profile(&self) -> &UnitProfile {
        &self.profile
    }

    pub fn def(&self) -> &str {
        &self.profile.def
    }

    pub fn is_destroyed(&self) -> bool {
        self.live.is_none()
    }

    /// Live handle of the agent.
    pub fn agent(&self) -> Result<UnitId> {
        self.live.ok_or(SchedulerError::UnitDestroyed(self.id))
    }

    pub fn position(&self, world: &dyn World) -> Option<Position> {
        world.unit_position(self.live?)
    }

    /// Drop the live handle. Slots are kept so pending tasks can still
    /// report back to this unit.
    pub fn destroy(&mut self) {
        self.live = None;
    }

    pub fn task(&self, priority: TaskPriority) -> Option<TaskId> {
        self.slots[priority.index()]
    }

    pub fn high_level_task(&self) -> Option<TaskId> {
        self.high_level
    }

    /// Place `task` in the slot for `priority`.
    ///
    /// If a higher slot is occupied the new task must be halted at once;
    /// otherwise the nearest lower occupied slot is halted.
    pub fn set_task(&mut self, task: TaskId, priority: TaskPriority) -> Result<Vec<SlotAction>> {
        if self.live.is_none() {
            return Err(SchedulerError::UnitDestroyed(self.id));
        }
        if self.slots[priority.index()].is_some() {
            warn!(unit = %self.id, def = %self.profile.def, %priority, "slot already taken");
            return Err(SchedulerError::SlotOccupied {
                unit: self.id,
                priority,
            });
        }
        self.slots[priority.index()] = Some(task);

        let mut actions = Vec::new();
        let mut found = false;
        for current in TaskPriority::ALL {
            let occupant = self.slots[current.index()];
            if current == priority {
                found = true;
            } else if current < priority && occupant.is_some() {
                actions.push(SlotAction::Halt(task));
                break;
            } else if found {
                if let Some(lower) = occupant {
                    actions.push(SlotAction::Halt(lower));
                    break;
                }
            }
        }
        Ok(actions)
    }

    pub fn set_high_level_task(&mut self, task: TaskId) -> Result<()> {
        if self.live.is_none() {
            return Err(SchedulerError::UnitDestroyed(self.id));
        }
        if let Some(existing) = self.high_level {
            warn!(unit = %self.id, %existing, "high-level slot already taken");
            return Err(SchedulerError::HighLevelOccupied(self.id));
        }
        self.high_level = Some(task);
        Ok(())
    }

    /// Clear every reference to `task` and report which lower task, if any,
    /// should continue.
    pub fn on_task_finished(&mut self, task: TaskId) -> Option<SlotAction> {
        if self.high_level == Some(task) {
            self.high_level = None;
        }
        let mut found = false;
        let mut higher = false;
        for current in TaskPriority::ALL {
            let slot = &mut self.slots[current.index()];
            if *slot == Some(task) {
                found = true;
                *slot = None;
            } else if !found && slot.is_some() {
                higher = true;
            } else if found && !higher {
                if let Some(lower) = *slot {
                    return Some(SlotAction::Resume(lower));
                }
            }
        }
        None
    }

    /// No HIGH, MEDIUM or high-level task. An idle LOW task does not count.
    pub fn is_free(&self) -> bool {
        self.slots[TaskPriority::High.index()].is_none()
            && self.slots[TaskPriority::Medium.index()].is_none()
            && self.high_level.is_none()
    }

    pub fn task_information(&self) -> TaskInformation {
        TaskInformation {
            high_level: self.high_level,
            high: self.slots[0],
            medium: self.slots[1],
            low: self.slots[2],
        }
    }
}
