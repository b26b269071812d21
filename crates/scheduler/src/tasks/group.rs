//! Group attack: a high-level task that keeps a set of units together and
//! walks them toward a target.

use std::collections::BTreeMap;

use skirmish_core::tuning::CommanderTuning;
use skirmish_core::{Command, Position, UnitId, World};
use tracing::{debug, info, warn};

use crate::handler::TaskHandler;
use crate::task::{Task, TaskContext};
use crate::tasks::move_to::MoveCloseTo;
use crate::types::{Status, TaskId, TaskPriority};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupAttackSettings {
    /// Distance at which a waypoint counts as reached.
    pub close_to_waypoint: f64,
    /// Allowed spread around the centroid, per unit in the group.
    pub regroup_radius_per_unit: f64,
    pub move_timeout: f64,
}

impl From<&CommanderTuning> for GroupAttackSettings {
    fn from(tuning: &CommanderTuning) -> Self {
        Self {
            close_to_waypoint: tuning.close_to_waypoint,
            regroup_radius_per_unit: tuning.regroup_radius_per_unit,
            move_timeout: tuning.move_timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    Regroup,
    Advance,
}

#[derive(Debug, Clone)]
pub struct GroupAttackTask {
    units: Vec<UnitId>,
    settings: GroupAttackSettings,
    phase: AttackPhase,
    target: Option<Position>,
    engaged: Option<UnitId>,
    /// Move child per unit.
    moves: BTreeMap<UnitId, TaskId>,
    halted: bool,
}

impl GroupAttackTask {
    pub const KIND: &'static str = "group_attack";

    pub fn new(units: Vec<UnitId>, settings: GroupAttackSettings) -> Self {
        let mut unique = Vec::with_capacity(units.len());
        for unit in units {
            if !unique.contains(&unit) {
                unique.push(unit);
            }
        }
        Self {
            units: unique,
            settings,
            phase: AttackPhase::Regroup,
            target: None,
            engaged: None,
            moves: BTreeMap::new(),
            halted: false,
        }
    }

    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    /// Where to go next. Without one the group heads for the closest
    /// visible enemy.
    pub fn set_target(&mut self, target: Option<Position>) {
        self.target = target;
    }

    /// Centroid of the living members.
    pub fn group_position(&self, world: &dyn World) -> Option<Position> {
        Position::centroid(self.units.iter().filter_map(|u| world.unit_position(*u)))
    }

    fn regroup_radius(&self) -> f64 {
        self.settings.regroup_radius_per_unit * self.units.len() as f64
    }

    /// Take over units released by another group. The caller binds them.
    pub fn absorb(&mut self, units: &[UnitId]) {
        for unit in units {
            if !self.units.contains(unit) {
                self.units.push(*unit);
            }
        }
        self.phase = AttackPhase::Regroup;
    }

    /// Stop every child and unbind every unit. Returns the units.
    pub fn release(&mut self, ctx: &mut TaskContext<'_>) -> Vec<UnitId> {
        self.clear_moves(ctx);
        let units = std::mem::take(&mut self.units);
        for unit in &units {
            ctx.unbind(*unit);
        }
        units
    }

    fn clear_moves(&mut self, ctx: &mut TaskContext<'_>) {
        let moves = std::mem::take(&mut self.moves);
        for child in moves.into_values() {
            ctx.remove(child);
        }
    }

    fn drop_unit(&mut self, ctx: &mut TaskContext<'_>, unit: UnitId) {
        self.units.retain(|u| *u != unit);
        if let Some(child) = self.moves.remove(&unit) {
            ctx.remove(child);
        }
        ctx.unbind(unit);
        debug!(group = %ctx.id(), unit = %unit, remaining = self.units.len(), "unit left group");
    }

    fn prune(&mut self, ctx: &mut TaskContext<'_>) {
        let dead: Vec<UnitId> = self
            .units
            .iter()
            .copied()
            .filter(|u| !ctx.world.is_unit_alive(*u))
            .collect();
        for unit in dead {
            self.drop_unit(ctx, unit);
        }
    }

    fn move_unit(&mut self, ctx: &mut TaskContext<'_>, unit: UnitId, to: Position, radius: f64) {
        if self.moves.contains_key(&unit) {
            return;
        }
        let task = MoveCloseTo::new(unit, to, radius, self.settings.move_timeout);
        if let Some(child) = ctx.spawn_child_on_unit(Box::new(task), unit, TaskPriority::Medium) {
            self.moves.insert(unit, child);
        }
    }

    fn regroup(&mut self, ctx: &mut TaskContext<'_>, center: Position) {
        let radius = self.regroup_radius();
        let outside: Vec<UnitId> = self
            .units
            .iter()
            .copied()
            .filter(|u| {
                ctx.world
                    .unit_position(*u)
                    .is_some_and(|p| p.distance_2d(&center) > radius)
            })
            .collect();
        if outside.is_empty() {
            self.clear_moves(ctx);
            self.phase = AttackPhase::Advance;
            debug!(group = %ctx.id(), units = self.units.len(), "group regrouped");
            return;
        }
        for unit in outside {
            self.move_unit(ctx, unit, center, radius / 2.0);
        }
    }

    /// Returns `Some(status)` when the attack is over.
    fn advance(&mut self, ctx: &mut TaskContext<'_>, center: Position) -> Option<Status> {
        let target = self.target.or_else(|| {
            ctx.world
                .visible_enemies()
                .into_iter()
                .min_by(|a, b| {
                    a.position
                        .distance_2d(&center)
                        .total_cmp(&b.position.distance_2d(&center))
                })
                .map(|e| e.position)
        })?;

        let reach = self.settings.close_to_waypoint;
        if center.distance_2d(&target) <= reach {
            let enemy = ctx
                .world
                .visible_enemies()
                .into_iter()
                .filter(|e| e.position.distance_2d(&target) <= reach)
                .min_by(|a, b| {
                    a.position
                        .distance_2d(&center)
                        .total_cmp(&b.position.distance_2d(&center))
                });
            if let Some(enemy) = enemy {
                if self.engaged != Some(enemy.id) {
                    self.engaged = Some(enemy.id);
                    for unit in self.units.clone() {
                        if let Err(err) = ctx.command(unit, Command::Attack { target: enemy.id }) {
                            warn!(group = %ctx.id(), %err, "attack command rejected");
                        }
                    }
                }
                return None;
            }
            self.target = None;
            self.engaged = None;
            if ctx.world.visible_enemies().is_empty() {
                return Some(Status::Completed);
            }
            return None;
        }

        let spread = self.units.iter().any(|u| {
            ctx.world
                .unit_position(*u)
                .is_some_and(|p| p.distance_2d(&center) > 2.0 * self.regroup_radius())
        });
        if spread {
            self.clear_moves(ctx);
            self.phase = AttackPhase::Regroup;
            return None;
        }
        for unit in self.units.clone() {
            self.move_unit(ctx, unit, target, reach);
        }
        None
    }
}

impl Task for GroupAttackTask {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        self.prune(ctx);
        if self.units.is_empty() {
            return Status::FailedUnexpected;
        }
        if self.halted {
            return Status::Executing;
        }
        let Some(center) = self.group_position(&*ctx.world) else {
            return Status::FailedUnexpected;
        };

        let outcome = match self.phase {
            AttackPhase::Regroup => {
                self.regroup(ctx, center);
                None
            }
            AttackPhase::Advance => self.advance(ctx, center),
        };
        match outcome {
            Some(status) => {
                self.clear_moves(ctx);
                status
            }
            None => Status::Executing,
        }
    }

    fn halt(&mut self, ctx: &mut TaskContext<'_>) {
        self.halted = true;
        for child in self.moves.values().copied().collect::<Vec<_>>() {
            ctx.halt(child);
        }
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) {
        self.halted = false;
        for child in self.moves.values().copied().collect::<Vec<_>>() {
            ctx.resume(child);
        }
    }

    fn on_task_finished(&mut self, ctx: &mut TaskContext<'_>, finished: TaskId, status: Status) {
        let Some(unit) = self
            .moves
            .iter()
            .find(|(_, child)| **child == finished)
            .map(|(unit, _)| *unit)
        else {
            return;
        };
        self.moves.remove(&unit);
        if status == Status::FailedUnexpected {
            self.drop_unit(ctx, unit);
        }
    }

    fn cancel(&mut self, ctx: &mut TaskContext<'_>) {
        self.clear_moves(ctx);
    }
}

/// Fold the smaller of two group attacks into the larger one.
///
/// The smaller group releases its units, the larger binds and absorbs them,
/// then the smaller is removed. Returns the surviving group.
pub fn merge_groups(
    handler: &mut TaskHandler,
    world: &mut dyn World,
    a: TaskId,
    b: TaskId,
) -> Option<TaskId> {
    if a == b {
        return None;
    }
    let len_a = handler.task_ref::<GroupAttackTask>(a)?.len();
    let len_b = handler.task_ref::<GroupAttackTask>(b)?.len();
    let (smaller, larger) = if len_a < len_b { (a, b) } else { (b, a) };

    let released = handler.with_task_as::<GroupAttackTask, _>(world, smaller, |g, ctx| g.release(ctx))?;
    let bound: Vec<UnitId> = released
        .into_iter()
        .filter(|unit| handler.bind_task(larger, *unit))
        .collect();
    handler.with_task_as::<GroupAttackTask, _>(world, larger, |g, _| g.absorb(&bound));
    handler.remove(world, smaller);

    info!(from = %smaller, into = %larger, moved = bound.len(), "merged attack groups");
    Some(larger)
}
