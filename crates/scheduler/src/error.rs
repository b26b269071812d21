use skirmish_core::UnitId;

use crate::types::TaskPriority;

/// Errors raised by unit slot bookkeeping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error("unit {0} is destroyed")]
    UnitDestroyed(UnitId),

    #[error("unit {0} is not registered")]
    UnknownUnit(UnitId),

    #[error("unit {unit} already has a {priority} priority task")]
    SlotOccupied { unit: UnitId, priority: TaskPriority },

    #[error("unit {0} already has a high-level task")]
    HighLevelOccupied(UnitId),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
