//! Concrete tasks built on the scheduler.

pub mod build;
pub mod group;
pub mod move_to;
pub mod scout;
pub mod sequence;

pub use build::BuildUnitTask;
pub use group::{merge_groups, AttackPhase, GroupAttackSettings, GroupAttackTask};
pub use move_to::MoveCloseTo;
pub use scout::{ScoutSettings, ScoutTask};
pub use sequence::SequenceTask;
