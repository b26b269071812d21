//! Decision layer of the agent: what the enemy fields, which spots are
//! taken, what to build next and who builds it.
//!
//! [`Commander`] ties the pieces together and is what a host drives.

pub mod assignment;
pub mod commander;
pub mod extraction;
pub mod generator;
pub mod threat;

pub use assignment::{assign_builders, Assignment};
pub use commander::{Commander, CommanderReport, CommanderState, GroupKind};
pub use extraction::{ExtractionPointMap, ExtractionSpot, SpotOwner};
pub use generator::{EconomyState, IncomeBaseline, PriorityGenerator, PriorityInputs, RankedEntry};
pub use threat::{Enemy, EnemyProfile, SightedEnemies};
