use skirmish_core::{Command, Resource, ResourceLevel, SandboxWorld};
use skirmish_scheduler::tasks::{GroupAttackTask, ScoutTask};

use super::*;

struct Sim {
    world: SandboxWorld,
    commander: Commander,
}

impl Sim {
    fn new(tuning: Tuning, spots: &[(f64, f64)]) -> Self {
        let catalog = UnitCatalog::bundled().unwrap();
        let mut world = SandboxWorld::new(catalog.clone());
        world.set_spots(spots.iter().map(|(x, z)| Position::flat(*x, *z)).collect());
        world.set_resource(
            Resource::Metal,
            ResourceLevel {
                current: 1000.0,
                income: 5.0,
                storage: 5000.0,
            },
        );
        world.set_resource(
            Resource::Energy,
            ResourceLevel {
                current: 1000.0,
                income: 20.0,
                storage: 5000.0,
            },
        );
        let commander = Commander::new(tuning, catalog, &world).unwrap();
        Self { world, commander }
    }

    fn without_opening(spots: &[(f64, f64)]) -> Self {
        let mut tuning = Tuning::default();
        tuning.commander.initial_build.clear();
        Self::new(tuning, spots)
    }

    fn flush(&mut self) {
        for event in self.world.drain_events() {
            self.commander.handle_event(&mut self.world, &event);
        }
    }

    fn spawn(&mut self, def: &str, x: f64) -> UnitId {
        let id = self.world.spawn_unit(def, Position::flat(x, 0.0));
        self.flush();
        id
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            for event in self.world.step(0.1) {
                self.commander.handle_event(&mut self.world, &event);
            }
            self.commander.tick(&mut self.world);
        }
    }

    fn group_len(&self, id: TaskId) -> usize {
        self.commander
            .handler()
            .task_ref::<GroupAttackTask>(id)
            .map_or(0, |g| g.len())
    }
}

#[test]
fn unknown_opening_type_is_rejected() {
    let mut tuning = Tuning::default();
    tuning.commander.initial_build = vec!["battleship".to_string()];
    let world = SandboxWorld::new(UnitCatalog::bundled().unwrap());
    let result = Commander::new(tuning, UnitCatalog::bundled().unwrap(), &world);
    assert!(matches!(result, Err(skirmish_core::SkirmishError::UnknownUnitDef(_))));
}

#[test]
fn opening_build_order_runs_on_first_mobile_builder() {
    let mut sim = Sim::new(Tuning::default(), &[(300.0, 0.0), (600.0, 0.0), (9000.0, 0.0)]);
    sim.spawn("commander", 0.0);

    sim.run(5);
    assert_eq!(sim.commander.state(), CommanderState::InitialBuild);
    assert_eq!(sim.commander.handler().nr_of_tasks(SequenceTask::KIND), 1);

    sim.run(600);
    assert_eq!(sim.commander.state(), CommanderState::Idle);
    assert!(sim.commander.clock().initial_build_done());

    let units = sim.commander.handler().units();
    assert!(units.nr_finished("metal_extractor") >= 2);
    assert!(units.nr_finished("fusion_reactor") >= 1);
    assert!(units.nr_finished("vehicle_plant") >= 1);

    // The opening claims the spots nearest the builder.
    let owned = sim
        .commander
        .extraction()
        .positions_by_owner(Some(SpotOwner::SelfOwned));
    assert!(owned.contains(&Position::flat(300.0, 0.0)));
    assert!(owned.contains(&Position::flat(600.0, 0.0)));
}

#[test]
fn opening_ends_even_when_its_builder_dies() {
    let mut sim = Sim::new(Tuning::default(), &[(300.0, 0.0)]);
    let builder = sim.spawn("commander", 0.0);
    sim.run(10);
    assert_eq!(sim.commander.state(), CommanderState::InitialBuild);

    sim.world.destroy_unit(builder);
    sim.flush();
    sim.run(100);
    assert_eq!(sim.commander.state(), CommanderState::Idle);
    assert!(sim.commander.handler().units().get(builder).is_none());
}

#[test]
fn empty_opening_goes_straight_to_idle() {
    let mut sim = Sim::without_opening(&[]);
    sim.run(1);
    assert_eq!(sim.commander.state(), CommanderState::Idle);
    assert_eq!(sim.commander.baseline().metal, 5.0);
    assert_eq!(sim.commander.baseline().energy, 20.0);
}

#[test]
fn idle_engineer_is_sent_to_the_closest_free_spot() {
    let mut sim = Sim::without_opening(&[(800.0, 0.0), (200.0, 0.0)]);
    let engineer = sim.spawn("engineer", 0.0);
    sim.run(20);

    assert!(sim.commander.generator().evaluations() > 0);
    let first = &sim.commander.assignments()[0];
    assert_eq!(first.builder, engineer);
    assert_eq!(first.def, "metal_extractor");
    assert_eq!(first.position, Some(Position::flat(200.0, 0.0)));
    assert!(!sim.commander.handler().units().get(engineer).unwrap().is_free());
}

#[test]
fn enough_idle_attackers_form_a_group() {
    let mut sim = Sim::without_opening(&[]);
    sim.world.add_enemy("heavy_tank", Position::flat(3000.0, 0.0));
    let tanks: Vec<UnitId> = (0..10).map(|i| sim.spawn("light_tank", i as f64 * 10.0)).collect();
    sim.run(5);

    assert_eq!(sim.commander.state(), CommanderState::Attack);
    let groups: Vec<_> = sim.commander.groups().iter().collect();
    assert_eq!(groups.len(), 1);
    let (group, kind) = groups[0];
    assert_eq!(*kind, GroupKind::Ground);

    let handler = sim.commander.handler();
    for tank in &tanks {
        assert_eq!(handler.units().get(*tank).unwrap().high_level_task(), Some(*group));
    }
    let task = handler.task_ref::<GroupAttackTask>(*group).unwrap();
    assert_eq!(task.target(), Some(Position::flat(3000.0, 0.0)));
}

#[test]
fn too_few_attackers_stay_home() {
    let mut sim = Sim::without_opening(&[]);
    for i in 0..9 {
        sim.spawn("light_tank", i as f64 * 10.0);
    }
    sim.run(10);
    assert_eq!(sim.commander.state(), CommanderState::Idle);
    assert!(sim.commander.groups().is_empty());
}

#[test]
fn groups_only_take_their_own_kind() {
    let mut sim = Sim::without_opening(&[]);
    for i in 0..10 {
        sim.spawn("light_tank", i as f64 * 10.0);
    }
    for i in 0..3 {
        sim.spawn("fighter", i as f64 * 10.0);
    }
    let flak = sim.spawn("flak_tank", 0.0);
    sim.run(5);

    let kinds: Vec<GroupKind> = sim.commander.groups().values().copied().collect();
    assert_eq!(kinds, vec![GroupKind::Ground, GroupKind::AirAntiAir]);
    // One anti-air ground unit is below its minimum.
    assert!(sim.commander.handler().units().get(flak).unwrap().is_free());
}

#[test]
fn close_groups_of_the_same_kind_merge() {
    let mut sim = Sim::without_opening(&[]);
    sim.world.add_enemy("heavy_tank", Position::flat(6000.0, 0.0));
    let mut tanks: Vec<UnitId> = (0..10).map(|i| sim.spawn("light_tank", i as f64 * 10.0)).collect();
    sim.run(3);
    assert_eq!(sim.commander.groups().len(), 1);

    tanks.extend((0..10).map(|i| sim.spawn("light_tank", 200.0 + i as f64 * 10.0)));
    sim.run(30);

    let groups: Vec<TaskId> = sim.commander.groups().keys().copied().collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(sim.group_len(groups[0]), 20);
    let handler = sim.commander.handler();
    for tank in &tanks {
        assert_eq!(handler.units().get(*tank).unwrap().high_level_task(), Some(groups[0]));
    }
}

#[test]
fn build_list_waits_for_a_free_builder() {
    let mut sim = Sim::without_opening(&[(100.0, 0.0)]);
    sim.spawn("light_tank", 0.0);
    sim.run(50);
    assert_eq!(sim.commander.generator().evaluations(), 0);
    assert!(sim.commander.assignments().is_empty());

    sim.spawn("engineer", 0.0);
    sim.run(20);
    assert!(sim.commander.generator().evaluations() > 0);
}

#[test]
fn healers_travel_with_ground_groups() {
    let mut sim = Sim::without_opening(&[]);
    sim.world.add_enemy("heavy_tank", Position::flat(3000.0, 0.0));
    let drone = sim.spawn("repair_drone", 0.0);
    for i in 0..9 {
        sim.spawn("light_tank", i as f64 * 10.0);
    }
    sim.run(5);
    // A healer never counts towards the minimum.
    assert_eq!(sim.commander.state(), CommanderState::Idle);

    sim.spawn("light_tank", 90.0);
    sim.run(5);
    let groups: Vec<(TaskId, GroupKind)> =
        sim.commander.groups().iter().map(|(id, kind)| (*id, *kind)).collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].1, GroupKind::Ground);
    assert_eq!(sim.group_len(groups[0].0), 11);
    let unit = sim.commander.handler().units().get(drone).unwrap();
    assert_eq!(unit.high_level_task(), Some(groups[0].0));
}

#[test]
fn free_scout_tours_the_extraction_spots() {
    let mut sim = Sim::without_opening(&[(1500.0, 0.0), (-2500.0, 0.0)]);
    let scout = sim.spawn("scout_plane", 0.0);
    sim.run(10);

    let handler = sim.commander.handler();
    assert_eq!(handler.nr_of_tasks(ScoutTask::KIND), 1);
    assert!(!handler.units().get(scout).unwrap().is_free());
    let task = sim.commander.scouting().unwrap();
    assert_eq!(handler.task_ref::<ScoutTask>(task).unwrap().remaining().len(), 1);
    assert!(matches!(sim.world.last_command(scout), Some(Command::Move { .. })));
    assert_eq!(sim.commander.report().scout_runs, 1);
}

#[test]
fn scouting_reveals_enemy_extractors() {
    let mut sim = Sim::without_opening(&[(1500.0, 0.0)]);
    sim.world.move_speed = 500.0;
    sim.world.add_hidden_enemy("metal_extractor", Position::flat(1505.0, 0.0));
    sim.spawn("scout_plane", 0.0);
    sim.run(40);

    assert_eq!(sim.commander.extraction().count(Some(SpotOwner::Enemy)), 1);
    assert_eq!(sim.commander.threat().len(), 1);
}

#[test]
fn events_reach_every_tracker() {
    let mut sim = Sim::new(Tuning::default(), &[(500.0, 0.0)]);
    let enemy = sim.world.add_enemy("metal_extractor", Position::flat(505.0, 0.0));
    sim.flush();
    assert_eq!(sim.commander.threat().len(), 1);
    assert_eq!(sim.commander.extraction().count(Some(SpotOwner::Enemy)), 1);

    sim.world.kill_enemy(enemy);
    sim.flush();
    assert!(sim.commander.threat().is_empty());
    assert_eq!(sim.commander.extraction().count(Some(SpotOwner::Free)), 1);

    let engineer = sim.spawn("engineer", 0.0);
    assert_eq!(sim.commander.handler().units().nr_all("engineer"), 1);
    sim.world.destroy_unit(engineer);
    sim.flush();
    assert_eq!(sim.commander.handler().units().nr_all("engineer"), 0);

    sim.run(1);
    assert!(sim.commander.handler().units().get(engineer).is_none());
}

#[test]
fn report_serializes() {
    let mut sim = Sim::without_opening(&[(100.0, 0.0)]);
    sim.spawn("engineer", 0.0);
    sim.run(10);

    let report = sim.commander.report();
    assert_eq!(report.state, CommanderState::Idle);
    assert_eq!(report.owned_units, 1);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["state"], "idle");
    assert!(json["ranked"].as_array().is_some_and(|r| !r.is_empty()));
}
