use skirmish_core::UnitGroup;
use skirmish_scheduler::tasks::{ScoutSettings, ScoutTask};
use skirmish_scheduler::{Observer, TaskPriority};
use tracing::{debug, info};

use super::Commander;
use crate::extraction::SpotOwner;

impl Commander {
    /// Send the first free scout over every extraction spot not owned by us,
    /// one run at a time.
    pub(super) fn update_scouting(&mut self) {
        if self.scouting.is_some() {
            return;
        }
        let now = self.clock.seconds();
        if self
            .last_scout
            .is_some_and(|last| now - last < self.tuning.commander.scout_update_seconds)
        {
            return;
        }
        let units = self.handler.units();
        let Some(scout) = units.free_units_by_group(UnitGroup::Scout).first().copied() else {
            return;
        };
        self.last_scout = Some(now);

        let mut targets = self.extraction.positions_by_owner(Some(SpotOwner::Free));
        targets.extend(self.extraction.positions_by_owner(Some(SpotOwner::Enemy)));
        if targets.is_empty() {
            debug!(%scout, "no extraction spots left to scout");
            return;
        }

        let sight_radius = units
            .get(scout)
            .and_then(|u| self.catalog.get(u.def()))
            .map_or(0.0, |d| d.sight_radius);
        let settings = ScoutSettings {
            sight_radius,
            home_radius: self.tuning.commander.scout_home_radius,
            move_timeout: self.tuning.commander.move_timeout_seconds,
        };
        let spots = targets.len();
        let id = self.handler.insert(Box::new(ScoutTask::new(scout, targets, settings)));
        let observer = Some(Observer::Listener(self.listener));
        if !self
            .handler
            .run_high_level(id, observer, &[scout], TaskPriority::Medium)
        {
            self.handler.discard(id);
            debug!(%scout, "scout refused the run");
            return;
        }
        self.scouting = Some(id);
        self.scout_runs += 1;
        info!(%scout, task = %id, spots, runs = self.scout_runs, "scouting started");
    }
}
