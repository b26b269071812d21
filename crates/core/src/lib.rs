pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod ids;
pub mod sandbox;
pub mod tuning;
pub mod world;

pub use catalog::{ArmorType, DamageType, UnitCatalog, UnitDef, UnitGroup};
pub use clock::GameClock;
pub use config::EngineConfig;
pub use error::*;
pub use event::{EventBus, EventKind, GameEvent};
pub use geometry::Position;
pub use ids::UnitId;
pub use sandbox::{ResourceLevel, SandboxWorld};
pub use tuning::{ArmorDamageMatrix, Tuning};
pub use world::{Command, CommandError, EnemySighting, Resource, World};
