use anyhow::{Context, Result};
use tracing::{debug, info};

use skirmish_core::{Resource, SandboxWorld, Tuning, UnitCatalog};
use skirmish_planner::{Commander, CommanderReport};

use crate::config::{Placement, SimConfig};

/// Sandbox world plus the commander playing in it.
pub struct Simulation {
    world: SandboxWorld,
    commander: Commander,
    tick_seconds: f64,
    report_every: f64,
    elapsed: f64,
    last_report: f64,
    /// Owned units and enemies not yet on the map, latest first.
    pending_units: Vec<Placement>,
    pending_enemies: Vec<Placement>,
}

impl Simulation {
    pub fn new(config: &SimConfig, tuning: Tuning, catalog: UnitCatalog) -> Result<Self> {
        config.validate(&catalog)?;

        let mut world = SandboxWorld::new(catalog.clone());
        world.build_seconds = config.build_seconds;
        world.move_speed = config.move_speed;
        world.set_spots(config.spot_positions());
        world.set_resource(Resource::Metal, config.metal.into());
        world.set_resource(Resource::Energy, config.energy.into());

        let commander =
            Commander::new(tuning, catalog, &world).context("failed to create commander")?;

        Ok(Self {
            world,
            commander,
            tick_seconds: config.tick_seconds,
            report_every: config.report_every_seconds,
            elapsed: 0.0,
            last_report: 0.0,
            pending_units: latest_first(&config.units),
            pending_enemies: latest_first(&config.enemies),
        })
    }

    pub fn commander(&self) -> &Commander {
        &self.commander
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Run until `seconds` of game time have passed.
    pub fn run_for(&mut self, seconds: f64) {
        let frames = (seconds / self.tick_seconds).ceil() as u64;
        info!(seconds, frames, "simulation starting");
        for _ in 0..frames {
            self.frame();
        }
        info!(seconds = self.elapsed, state = ?self.commander.state(), "simulation finished");
    }

    /// One frame: arrivals, world step, events, commander update.
    pub fn frame(&mut self) {
        self.place_arrivals();

        for event in self.world.step(self.tick_seconds) {
            self.commander.handle_event(&mut self.world, &event);
        }
        self.commander.tick(&mut self.world);
        self.elapsed += self.tick_seconds;

        if self.report_every > 0.0 && self.elapsed - self.last_report >= self.report_every {
            self.last_report = self.elapsed;
            self.log_progress();
        }
    }

    fn place_arrivals(&mut self) {
        while let Some(next) = self.pending_units.last() {
            if next.at > self.elapsed {
                break;
            }
            if let Some(unit) = self.pending_units.pop() {
                let id = self.world.spawn_unit(&unit.def, unit.position());
                debug!(unit = %id, def = %unit.def, "unit placed");
            }
        }
        while let Some(next) = self.pending_enemies.last() {
            if next.at > self.elapsed {
                break;
            }
            if let Some(enemy) = self.pending_enemies.pop() {
                let id = self.world.add_enemy(&enemy.def, enemy.position());
                debug!(enemy = %id, def = %enemy.def, "enemy sighted");
            }
        }
        for event in self.world.drain_events() {
            self.commander.handle_event(&mut self.world, &event);
        }
    }

    fn log_progress(&self) {
        let report = self.commander.report();
        let top: Vec<String> = report
            .ranked
            .iter()
            .take(3)
            .map(|e| format!("{}={:.0}", e.def, e.score))
            .collect();
        info!(
            t = %format!("{:.0}s", self.elapsed),
            state = ?report.state,
            units = report.owned_units,
            enemies = report.known_enemies,
            spots = report.spots_owned,
            groups = report.attack_groups,
            tasks = report.active_tasks,
            top = %top.join(" "),
            "progress"
        );
    }

    pub fn report(&self) -> CommanderReport {
        self.commander.report()
    }
}

fn latest_first(placements: &[Placement]) -> Vec<Placement> {
    let mut sorted = placements.to_vec();
    sorted.sort_by(|a, b| b.at.total_cmp(&a.at));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_planner::CommanderState;

    fn quick(config: &SimConfig) -> Simulation {
        Simulation::new(
            config,
            Tuning::default(),
            UnitCatalog::bundled().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn built_in_scenario_leaves_the_opening() {
        let mut config = SimConfig::default();
        config.tick_seconds = 0.5;
        config.report_every_seconds = 0.0;
        let mut sim = quick(&config);
        sim.run_for(240.0);

        let report = sim.report();
        assert_ne!(report.state, CommanderState::InitialBuild);
        assert!(report.spots_owned >= 2);
        assert!(report.owned_units > 1);
        assert_eq!(report.known_enemies, 2);
        assert_eq!(report.spots_enemy, 1);
    }

    #[test]
    fn enemies_show_up_on_schedule() {
        let mut config = SimConfig::default();
        config.tick_seconds = 1.0;
        config.report_every_seconds = 0.0;
        let mut sim = quick(&config);

        sim.run_for(119.0);
        assert!(sim.commander().threat().is_empty());
        sim.run_for(2.0);
        assert_eq!(sim.commander().threat().len(), 2);
    }

    #[test]
    fn late_units_join_the_registry() {
        let mut config = SimConfig::default();
        config.tick_seconds = 1.0;
        config.report_every_seconds = 0.0;
        config.enemies.clear();
        config.units.push(Placement {
            def: "engineer".to_string(),
            x: 0.0,
            z: 0.0,
            at: 10.0,
        });
        let mut sim = quick(&config);

        sim.run_for(5.0);
        assert_eq!(sim.commander().handler().units().nr_all("engineer"), 0);
        sim.run_for(6.0);
        assert_eq!(sim.commander().handler().units().nr_all("engineer"), 1);
    }

    #[test]
    fn invalid_scenario_is_rejected() {
        let mut config = SimConfig::default();
        config.units[0].def = "battleship".to_string();
        let result = Simulation::new(&config, Tuning::default(), UnitCatalog::bundled().unwrap());
        assert!(result.is_err());
    }
}
