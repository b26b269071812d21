//! Top-level agent: wires events into the trackers and drives building and
//! attacking from the game tick.
//!
//! The commander walks `InitialBuild -> Idle -> Attack`. During the opening
//! it runs the configured build order on the first mobile builder. After
//! that it re-ranks the build list on a fixed interval, hands the list to
//! idle builders, keeps one scout touring the extraction spots, and once
//! enough attackers are idle it groups them up and sends them out.

mod attack;
mod scout;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde::Serialize;
use skirmish_core::{
    EventBus, EventKind, GameClock, GameEvent, Position, Result, Tuning, UnitCatalog, UnitGroup,
    UnitId, World,
};
use skirmish_scheduler::tasks::{BuildUnitTask, SequenceTask};
use skirmish_scheduler::{
    ListenerId, Observer, SchedulerMetrics, Task, TaskHandler, TaskId, TaskPriority,
};
use tracing::{debug, info, warn};

pub use attack::GroupKind;

use crate::assignment::{assign_builders, Assignment};
use crate::extraction::{ExtractionPointMap, SpotOwner};
use crate::generator::{EconomyState, IncomeBaseline, PriorityGenerator, PriorityInputs, RankedEntry};
use crate::threat::SightedEnemies;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommanderState {
    InitialBuild,
    Idle,
    Attack,
}

/// Parts of the commander that consume game events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Registry,
    Threat,
    Extraction,
    Tasks,
}

const REGISTRY_EVENTS: &[EventKind] = &[
    EventKind::UnitCreated,
    EventKind::UnitFinished,
    EventKind::UnitDestroyed,
];
const THREAT_EVENTS: &[EventKind] = &[
    EventKind::EnemySighted,
    EventKind::EnemyLost,
    EventKind::EnemyDestroyed,
];
const EXTRACTION_EVENTS: &[EventKind] = &[
    EventKind::UnitCreated,
    EventKind::UnitDestroyed,
    EventKind::EnemySighted,
    EventKind::EnemyDestroyed,
];
const TASK_EVENTS: &[EventKind] = &[
    EventKind::UnitCreated,
    EventKind::UnitFinished,
    EventKind::UnitDestroyed,
    EventKind::UnitIdle,
    EventKind::CommandFailed,
    EventKind::EnemySighted,
    EventKind::EnemyLost,
    EventKind::EnemyDestroyed,
];

pub struct Commander {
    tuning: Tuning,
    catalog: UnitCatalog,
    handler: TaskHandler,
    threat: SightedEnemies,
    extraction: ExtractionPointMap,
    generator: PriorityGenerator,
    clock: GameClock,
    baseline: IncomeBaseline,
    bus: EventBus<Component>,
    listener: ListenerId,
    state: CommanderState,
    initial_build: Option<TaskId>,
    groups: BTreeMap<TaskId, GroupKind>,
    last_attack: f64,
    last_merge: f64,
    scouting: Option<TaskId>,
    last_scout: Option<f64>,
    scout_runs: u64,
    /// Destroyed units waiting for their tasks to let go.
    retiring: Vec<UnitId>,
    assignments: Vec<Assignment>,
}

/// Snapshot for logs and dumps.
#[derive(Debug, Clone, Serialize)]
pub struct CommanderReport {
    pub state: CommanderState,
    pub game_seconds: f64,
    pub seconds_since_initial_build: f64,
    pub frames: u64,
    pub owned_units: usize,
    pub known_enemies: usize,
    pub spots_owned: usize,
    pub spots_free: usize,
    pub spots_enemy: usize,
    pub attack_groups: usize,
    pub scouting: bool,
    pub scout_runs: u64,
    pub active_tasks: usize,
    pub evaluations: u64,
    pub assignments: usize,
    pub ranked: Vec<RankedEntry>,
    pub scheduler: SchedulerMetrics,
}

impl Commander {
    /// Fails when the tuning is inconsistent or names a type the catalog
    /// does not know.
    pub fn new(tuning: Tuning, catalog: UnitCatalog, world: &dyn World) -> Result<Self> {
        tuning.validate()?;
        for def in &tuning.commander.initial_build {
            catalog.require(def)?;
        }

        let mut handler = TaskHandler::new(&tuning.scheduler);
        let listener = handler.register_listener();
        let mut bus = EventBus::new();
        bus.subscribe(Component::Registry, REGISTRY_EVENTS);
        bus.subscribe(Component::Threat, THREAT_EVENTS);
        bus.subscribe(Component::Extraction, EXTRACTION_EVENTS);
        bus.subscribe(Component::Tasks, TASK_EVENTS);

        let extraction = ExtractionPointMap::from_world(world);
        info!(
            units = catalog.len(),
            spots = extraction.count(None),
            opening = tuning.commander.initial_build.len(),
            "commander ready"
        );
        Ok(Self {
            threat: SightedEnemies::new(&tuning.threat),
            generator: PriorityGenerator::new(&tuning),
            tuning,
            catalog,
            handler,
            extraction,
            clock: GameClock::new(),
            baseline: IncomeBaseline::default(),
            bus,
            listener,
            state: CommanderState::InitialBuild,
            initial_build: None,
            groups: BTreeMap::new(),
            last_attack: 0.0,
            last_merge: 0.0,
            scouting: None,
            last_scout: None,
            scout_runs: 0,
            retiring: Vec::new(),
            assignments: Vec::new(),
        })
    }

    pub fn state(&self) -> CommanderState {
        self.state
    }

    pub fn handler(&self) -> &TaskHandler {
        &self.handler
    }

    pub fn threat(&self) -> &SightedEnemies {
        &self.threat
    }

    pub fn extraction(&self) -> &ExtractionPointMap {
        &self.extraction
    }

    pub fn generator(&self) -> &PriorityGenerator {
        &self.generator
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn baseline(&self) -> IncomeBaseline {
        self.baseline
    }

    /// Live attack groups and their kinds.
    pub fn groups(&self) -> &BTreeMap<TaskId, GroupKind> {
        &self.groups
    }

    /// Running scout task, if any.
    pub fn scouting(&self) -> Option<TaskId> {
        self.scouting
    }

    /// Every build handed out so far, oldest first.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Route one game event to every component subscribed to its kind.
    pub fn handle_event(&mut self, world: &mut dyn World, event: &GameEvent) {
        for component in self.bus.listeners(event.kind()) {
            match component {
                Component::Registry => self.track_unit(event),
                Component::Threat => self.track_enemy(event),
                Component::Extraction => {
                    self.extraction
                        .handle_event(event, &self.tuning.special_defs.metal_extractor);
                }
                Component::Tasks => {
                    self.handler.dispatch_event(world, event);
                }
            }
        }
    }

    fn track_unit(&mut self, event: &GameEvent) {
        let units = self.handler.units_mut();
        match event {
            GameEvent::UnitCreated { unit, def, builder, .. } => match self.catalog.get(def) {
                Some(unit_def) => units.unit_created(*unit, unit_def, *builder),
                None => warn!(%unit, %def, "created unit of unknown type"),
            },
            GameEvent::UnitFinished { unit } => {
                units.unit_finished(*unit);
            }
            GameEvent::UnitDestroyed { unit, .. } => {
                if units.unit_destroyed(*unit) {
                    self.retiring.push(*unit);
                }
            }
            _ => {}
        }
    }

    fn track_enemy(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EnemySighted(sighting) => {
                self.threat
                    .enemy_sighted(&self.catalog, sighting, self.clock.seconds());
            }
            GameEvent::EnemyLost { enemy } => {
                self.threat.enemy_lost(*enemy);
            }
            GameEvent::EnemyDestroyed { enemy, .. } => {
                self.threat.enemy_destroyed(*enemy);
            }
            _ => {}
        }
    }

    /// One game frame: read the clock, run the state logic, then give the
    /// scheduler its share of the frame.
    pub fn tick(&mut self, world: &mut dyn World) {
        self.clock.advance(world);

        match self.state {
            CommanderState::InitialBuild => self.run_initial_build(world),
            CommanderState::Idle | CommanderState::Attack => {
                let now = self.clock.seconds();
                let expired = self
                    .threat
                    .refresh(&self.catalog, &world.visible_enemies(), now);
                if expired > 0 {
                    debug!(expired, known = self.threat.len(), "stale enemies forgotten");
                }
                self.update_attack(world);
                self.update_scouting();
                self.update_building(world);
            }
        }

        self.handler.update(world, self.clock.delta());
        self.collect_notifications(world);
        self.discard_retired();
    }

    fn run_initial_build(&mut self, world: &mut dyn World) {
        if self.initial_build.is_some() {
            return;
        }
        if self.tuning.commander.initial_build.is_empty() {
            self.finish_initial_build(world);
            return;
        }
        let Some(builder) = self
            .handler
            .units()
            .free_units_by_group(UnitGroup::MobileBuilder)
            .first()
            .copied()
        else {
            return;
        };

        let origin = world.unit_position(builder);
        let mut claimed: Vec<Position> = Vec::new();
        let mut children: Vec<Box<dyn Task>> = Vec::new();
        for def in &self.tuning.commander.initial_build {
            let spot = if *def == self.tuning.special_defs.metal_extractor {
                origin.and_then(|from| {
                    self.extraction
                        .positions_by_owner(Some(SpotOwner::Free))
                        .into_iter()
                        .filter(|p| !claimed.contains(p))
                        .min_by(|a, b| a.distance_2d(&from).total_cmp(&b.distance_2d(&from)))
                })
            } else {
                None
            };
            let task = match spot {
                Some(position) => {
                    claimed.push(position);
                    BuildUnitTask::at(builder, def.as_str(), position)
                }
                None => BuildUnitTask::new(builder, def.as_str()),
            };
            children.push(Box::new(task));
        }

        let sequence = SequenceTask::on_unit(children, builder, TaskPriority::Medium);
        let id = self.handler.insert(Box::new(sequence));
        if self.handler.run(id, Some(Observer::Listener(self.listener))) {
            info!(%builder, task = %id, steps = self.tuning.commander.initial_build.len(), "initial build started");
            self.initial_build = Some(id);
        } else {
            self.handler.discard(id);
        }
    }

    fn finish_initial_build(&mut self, world: &dyn World) {
        self.clock.mark_initial_build();
        self.baseline = IncomeBaseline::capture(world);
        self.state = CommanderState::Idle;
        info!(
            at = self.clock.seconds(),
            metal = self.baseline.metal,
            energy = self.baseline.energy,
            "initial build finished"
        );
    }

    fn update_building(&mut self, world: &mut dyn World) {
        let now = self.clock.seconds_since_initial_build();
        if !self.generator.is_due(now) {
            return;
        }
        self.generator.mark_evaluated(now);
        if self
            .handler
            .units()
            .free_units_by_group(UnitGroup::Builder)
            .is_empty()
        {
            return;
        }

        let inputs = PriorityInputs {
            catalog: &self.catalog,
            units: self.handler.units(),
            threat: &self.threat,
            extraction: &self.extraction,
            economy: EconomyState::read(world, &self.clock, &self.baseline),
        };
        self.generator.generate(&inputs);

        let assigned = assign_builders(
            &mut self.handler,
            world,
            self.generator.ranked(),
            &self.extraction,
            &self.tuning.special_defs,
            None,
        );
        self.assignments.extend(assigned);
    }

    fn collect_notifications(&mut self, world: &dyn World) {
        for note in self.handler.take_notifications() {
            if Some(note.task) == self.initial_build && self.state == CommanderState::InitialBuild {
                debug!(task = %note.task, status = ?note.status, "initial build ended");
                self.finish_initial_build(world);
            } else if Some(note.task) == self.scouting {
                debug!(task = %note.task, status = ?note.status, "scout run ended");
                self.scouting = None;
            } else if let Some(kind) = self.groups.remove(&note.task) {
                info!(task = %note.task, ?kind, status = ?note.status, "attack group ended");
            }
        }
    }

    fn discard_retired(&mut self) {
        let units = self.handler.units_mut();
        self.retiring.retain(|id| {
            let idle = units.get(*id).map_or(true, |u| u.is_free());
            if idle {
                units.discard(*id);
            }
            !idle
        });
    }

    pub fn report(&self) -> CommanderReport {
        CommanderReport {
            state: self.state,
            game_seconds: self.clock.seconds(),
            seconds_since_initial_build: self.clock.seconds_since_initial_build(),
            frames: self.clock.frames(),
            owned_units: self.handler.units().finished_units().count(),
            known_enemies: self.threat.len(),
            spots_owned: self.extraction.count(Some(SpotOwner::SelfOwned)),
            spots_free: self.extraction.count(Some(SpotOwner::Free)),
            spots_enemy: self.extraction.count(Some(SpotOwner::Enemy)),
            attack_groups: self.groups.len(),
            scouting: self.scouting.is_some(),
            scout_runs: self.scout_runs,
            active_tasks: self.handler.active_len(),
            evaluations: self.generator.evaluations(),
            assignments: self.assignments.len(),
            ranked: self.generator.ranked().to_vec(),
            scheduler: self.handler.metrics().clone(),
        }
    }
}
