use serde::Serialize;
use skirmish_core::tuning::CommanderTuning;
use skirmish_core::{Position, UnitGroup, UnitId, World};
use skirmish_scheduler::tasks::{merge_groups, GroupAttackSettings, GroupAttackTask};
use skirmish_scheduler::{Observer, TaskId, TaskPriority, UnitProfile};
use tracing::{debug, info, warn};

use super::{Commander, CommanderState};
use crate::extraction::SpotOwner;

/// Attack groups only ever hold one kind of unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Ground,
    Air,
    GroundAntiAir,
    AirAntiAir,
}

impl GroupKind {
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Ground,
        GroupKind::Air,
        GroupKind::GroundAntiAir,
        GroupKind::AirAntiAir,
    ];

    pub fn of(profile: &UnitProfile) -> Self {
        match (profile.flying, profile.anti_air) {
            (false, false) => GroupKind::Ground,
            (true, false) => GroupKind::Air,
            (false, true) => GroupKind::GroundAntiAir,
            (true, true) => GroupKind::AirAntiAir,
        }
    }

    /// Idle units of this kind needed before a group is sent out.
    pub fn min_units(self, tuning: &CommanderTuning) -> usize {
        match self {
            GroupKind::Ground => tuning.attack_force_ground_min,
            GroupKind::Air => tuning.attack_force_air_min,
            GroupKind::GroundAntiAir => tuning.attack_force_ground_anti_air_min,
            GroupKind::AirAntiAir => tuning.attack_force_air_anti_air_min,
        }
    }
}

impl Commander {
    pub(super) fn update_attack(&mut self, world: &mut dyn World) {
        let now = self.clock.seconds();

        if self.state == CommanderState::Idle {
            let idle = self.idle_attackers().len();
            if idle >= self.tuning.commander.attack_force_ground_min {
                info!(idle, "switching to attack");
                self.state = CommanderState::Attack;
            } else {
                return;
            }
        }

        if now - self.last_attack >= self.tuning.commander.attack_update_seconds {
            self.last_attack = now;
            self.form_groups(world);
        }
        if now - self.last_merge >= self.tuning.commander.merge_update_seconds {
            self.last_merge = now;
            self.merge_close_groups(world);
        }
    }

    /// Free mobile attack-force units that are not healers, ascending by id.
    fn idle_attackers(&self) -> Vec<UnitId> {
        let units = self.handler.units();
        units
            .free_units_by_group(UnitGroup::AttackForce)
            .into_iter()
            .filter(|id| {
                units.get(*id).is_some_and(|u| {
                    u.profile().mobile && !u.profile().in_group(UnitGroup::Healer)
                })
            })
            .collect()
    }

    /// Free mobile healers, ascending by id.
    fn idle_healers(&self) -> Vec<UnitId> {
        let units = self.handler.units();
        units
            .free_units_by_group(UnitGroup::Healer)
            .into_iter()
            .filter(|id| units.get(*id).is_some_and(|u| u.profile().mobile))
            .collect()
    }

    fn form_groups(&mut self, world: &mut dyn World) {
        let idle = self.idle_attackers();
        for kind in GroupKind::ALL {
            let mut members: Vec<UnitId> = idle
                .iter()
                .copied()
                .filter(|id| {
                    self.handler
                        .units()
                        .get(*id)
                        .is_some_and(|u| GroupKind::of(u.profile()) == kind)
                })
                .collect();
            if members.is_empty() || members.len() < kind.min_units(&self.tuning.commander) {
                continue;
            }
            // Healers only travel with plain ground groups.
            if kind == GroupKind::Ground {
                members.extend(self.idle_healers());
            }

            let mut group =
                GroupAttackTask::new(members.clone(), GroupAttackSettings::from(&self.tuning.commander));
            let target = group
                .group_position(world)
                .and_then(|from| self.attack_target(from));
            group.set_target(target);

            let id = self.handler.insert(Box::new(group));
            let observer = Some(Observer::Listener(self.listener));
            if !self
                .handler
                .run_high_level(id, observer, &members, TaskPriority::Medium)
            {
                self.handler.discard(id);
                debug!(?kind, units = members.len(), "attack group could not bind its units");
                continue;
            }
            info!(task = %id, ?kind, units = members.len(), ?target, "attack group formed");
            self.groups.insert(id, kind);
        }
    }

    /// Closest enemy extractor, else the closest known ground enemy.
    fn attack_target(&self, from: Position) -> Option<Position> {
        self.extraction
            .closest(from, Some(SpotOwner::Enemy))
            .or_else(|| self.threat.closest_enemy(from, false).map(|e| e.position))
    }

    /// Merge groups of the same kind whose centers are close, one pair at a
    /// time, until no close pair remains.
    fn merge_close_groups(&mut self, world: &mut dyn World) {
        let radius = self.tuning.commander.merge_close_radius;
        let mut skipped: Vec<(TaskId, TaskId)> = Vec::new();
        loop {
            let centers: Vec<(TaskId, GroupKind, Position)> = self
                .groups
                .iter()
                .filter_map(|(id, kind)| {
                    let group = self.handler.task_ref::<GroupAttackTask>(*id)?;
                    Some((*id, *kind, group.group_position(&*world)?))
                })
                .collect();

            let Some((a, b)) = close_pair(&centers, radius, &skipped) else {
                break;
            };

            match merge_groups(&mut self.handler, world, a, b) {
                Some(survivor) => {
                    let gone = if survivor == a { b } else { a };
                    self.groups.remove(&gone);
                }
                None => {
                    warn!(first = %a, second = %b, "attack groups could not be merged");
                    skipped.push((a, b));
                }
            }
        }
    }
}

/// First same-kind pair within `radius` of each other that is not in
/// `skipped`, in list order.
fn close_pair(
    centers: &[(TaskId, GroupKind, Position)],
    radius: f64,
    skipped: &[(TaskId, TaskId)],
) -> Option<(TaskId, TaskId)> {
    centers.iter().enumerate().find_map(|(i, a)| {
        centers[i + 1..]
            .iter()
            .find(|b| {
                a.1 == b.1 && a.2.distance_2d(&b.2) <= radius && !skipped.contains(&(a.0, b.0))
            })
            .map(|b| (a.0, b.0))
    })
}
