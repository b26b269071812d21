//! Boundary to the game engine.
//!
//! Every call is synchronous and must not block. Commands are the only way
//! tasks produce side effects in the game.

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::UnitId;

/// Tradeable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Metal,
    Energy,
}

/// Order issued to a single owned unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Build { def: String, position: Position },
    Move { position: Position },
    Attack { target: UnitId },
    Repair { target: UnitId },
    Stop,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Move { .. } => "move",
            Command::Attack { .. } => "attack",
            Command::Repair { .. } => "repair",
            Command::Stop => "stop",
        }
    }
}

/// Why the engine refused a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    #[error("unit {unit} rejected {command} command: {reason}")]
    Rejected {
        unit: UnitId,
        command: &'static str,
        reason: String,
    },
}

/// A currently visible hostile unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySighting {
    pub id: UnitId,
    pub def: String,
    pub position: Position,
    pub max_health: f64,
    /// Primary weapon damage per second, 0 when unarmed.
    #[serde(default)]
    pub dps: f64,
    #[serde(default)]
    pub flying: bool,
}

/// Queries and commands the engine core needs from the simulation host.
pub trait World {
    /// Seconds of game time since the match started.
    fn game_time(&self) -> f64;

    /// Seconds of game time elapsed during the last frame.
    fn delta_time(&self) -> f64;

    fn resource_current(&self, resource: Resource) -> f64;
    fn resource_income(&self, resource: Resource) -> f64;
    fn resource_storage(&self, resource: Resource) -> f64;

    /// Type name of an owned or visible unit.
    fn unit_def(&self, unit: UnitId) -> Option<&str>;
    fn unit_position(&self, unit: UnitId) -> Option<Position>;
    fn is_unit_alive(&self, unit: UnitId) -> bool;

    fn visible_enemies(&self) -> Vec<EnemySighting>;

    /// Whether a unit of type `producer` can construct a `target`.
    fn can_build(&self, producer: &str, target: &str) -> bool;

    /// Positions of every resource extraction spot on the map.
    fn extraction_spots(&self) -> Vec<Position>;

    /// Closest position near `near` where `def` can be placed.
    fn find_build_position(&self, def: &str, near: Position) -> Option<Position>;

    fn elevation(&self, x: f64, z: f64) -> f64;

    fn command(&mut self, unit: UnitId, command: Command) -> Result<(), CommandError>;
}
