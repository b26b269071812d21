//! Deterministic in-memory [`World`] for tests and offline simulation.
//!
//! Units move in straight lines, constructions progress at a fixed rate and
//! every state change is reported as a [`GameEvent`] from [`SandboxWorld::step`].

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::catalog::UnitCatalog;
use crate::event::GameEvent;
use crate::geometry::Position;
use crate::ids::UnitId;
use crate::world::{Command, CommandError, EnemySighting, Resource, World};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceLevel {
    pub current: f64,
    pub income: f64,
    pub storage: f64,
}

#[derive(Debug, Clone)]
struct SandboxUnit {
    def: String,
    position: Position,
    order: Option<Command>,
    /// Construction started by the current build order.
    building: Option<UnitId>,
    /// Build progress in [0, 1) while under construction.
    progress: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SandboxWorld {
    catalog: UnitCatalog,
    time: f64,
    delta: f64,
    resources: HashMap<Resource, ResourceLevel>,
    units: BTreeMap<UnitId, SandboxUnit>,
    enemies: BTreeMap<UnitId, EnemySighting>,
    /// Hostile units nobody has seen yet.
    hidden: BTreeMap<UnitId, EnemySighting>,
    spots: Vec<Position>,
    command_log: Vec<(UnitId, Command)>,
    pending: Vec<GameEvent>,
    reject_commands: bool,
    next_id: u32,
    /// Seconds a construction needs to finish.
    pub build_seconds: f64,
    /// Distance a unit covers per second.
    pub move_speed: f64,
}

impl SandboxWorld {
    pub fn new(catalog: UnitCatalog) -> Self {
        Self {
            catalog,
            time: 0.0,
            delta: 0.0,
            resources: HashMap::new(),
            units: BTreeMap::new(),
            enemies: BTreeMap::new(),
            hidden: BTreeMap::new(),
            spots: Vec::new(),
            command_log: Vec::new(),
            pending: Vec::new(),
            reject_commands: false,
            next_id: 1,
            build_seconds: 5.0,
            move_speed: 100.0,
        }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    fn allocate_id(&mut self) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn set_resource(&mut self, resource: Resource, level: ResourceLevel) {
        self.resources.insert(resource, level);
    }

    pub fn set_spots(&mut self, spots: Vec<Position>) {
        self.spots = spots;
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_reject_commands(&mut self, reject: bool) {
        self.reject_commands = reject;
    }

    /// Place a finished owned unit. Emits created and finished events.
    pub fn spawn_unit(&mut self, def: &str, position: Position) -> UnitId {
        let id = self.allocate_id();
        self.units.insert(
            id,
            SandboxUnit {
                def: def.to_string(),
                position,
                order: None,
                building: None,
                progress: None,
            },
        );
        self.pending.push(GameEvent::UnitCreated {
            unit: id,
            def: def.to_string(),
            builder: None,
            position,
        });
        self.pending.push(GameEvent::UnitFinished { unit: id });
        id
    }

    /// Remove an owned unit. Emits a destroyed event.
    pub fn destroy_unit(&mut self, id: UnitId) -> bool {
        match self.units.remove(&id) {
            Some(unit) => {
                self.pending.push(GameEvent::UnitDestroyed {
                    unit: id,
                    def: unit.def,
                    position: unit.position,
                    attacker: None,
                });
                true
            }
            None => false,
        }
    }

    pub fn move_unit(&mut self, id: UnitId, position: Position) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.position = position;
        }
    }

    /// Make a hostile unit visible. Stats come from the catalog when known.
    pub fn add_enemy(&mut self, def: &str, position: Position) -> UnitId {
        let sighting = self.new_enemy(def, position);
        let id = sighting.id;
        self.enemies.insert(id, sighting.clone());
        self.pending.push(GameEvent::EnemySighted(sighting));
        id
    }

    /// Place a hostile unit that stays unseen until an owned unit gets
    /// within its sight radius.
    pub fn add_hidden_enemy(&mut self, def: &str, position: Position) -> UnitId {
        let sighting = self.new_enemy(def, position);
        let id = sighting.id;
        self.hidden.insert(id, sighting);
        id
    }

    pub fn is_enemy_hidden(&self, id: UnitId) -> bool {
        self.hidden.contains_key(&id)
    }

    fn new_enemy(&mut self, def: &str, position: Position) -> EnemySighting {
        let id = self.allocate_id();
        let (max_health, dps, flying) = self
            .catalog
            .get(def)
            .map(|d| (d.max_health, d.dps, d.flying))
            .unwrap_or((100.0, 0.0, false));
        EnemySighting {
            id,
            def: def.to_string(),
            position,
            max_health,
            dps,
            flying,
        }
    }

    /// Hide a hostile unit without destroying it.
    pub fn lose_enemy(&mut self, id: UnitId) -> bool {
        if self.enemies.remove(&id).is_some() {
            self.pending.push(GameEvent::EnemyLost { enemy: id });
            true
        } else {
            false
        }
    }

    pub fn kill_enemy(&mut self, id: UnitId) -> bool {
        match self.enemies.remove(&id) {
            Some(enemy) => {
                self.pending.push(GameEvent::EnemyDestroyed {
                    enemy: id,
                    def: enemy.def,
                    position: enemy.position,
                    attacker: None,
                });
                true
            }
            None => false,
        }
    }

    /// Every accepted command, oldest first.
    pub fn commands(&self) -> &[(UnitId, Command)] {
        &self.command_log
    }

    pub fn last_command(&self, unit: UnitId) -> Option<&Command> {
        self.command_log
            .iter()
            .rev()
            .find(|(u, _)| *u == unit)
            .map(|(_, c)| c)
    }

    pub fn owned_units(&self) -> impl Iterator<Item = (UnitId, &str)> {
        self.units.iter().map(|(id, u)| (*id, u.def.as_str()))
    }

    pub fn is_under_construction(&self, id: UnitId) -> bool {
        self.units.get(&id).is_some_and(|u| u.progress.is_some())
    }

    /// Events produced since the last call, without advancing time.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Advance time by `delta` seconds and carry out unit orders.
    pub fn step(&mut self, delta: f64) -> Vec<GameEvent> {
        self.delta = delta;
        self.time += delta;

        for level in self.resources.values_mut() {
            level.current += level.income * delta;
            if level.storage > 0.0 {
                level.current = level.current.min(level.storage);
            }
        }

        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            self.step_unit(id, delta);
        }
        self.reveal_hidden();

        self.drain_events()
    }

    /// Turn hidden enemies within sight of a finished owned unit into
    /// sightings.
    fn reveal_hidden(&mut self) {
        if self.hidden.is_empty() {
            return;
        }
        let catalog = &self.catalog;
        let eyes: Vec<(Position, f64)> = self
            .units
            .values()
            .filter(|u| u.progress.is_none())
            .map(|u| {
                let radius = catalog.get(&u.def).map_or(0.0, |d| d.sight_radius);
                (u.position, radius)
            })
            .collect();
        let seen: Vec<UnitId> = self
            .hidden
            .values()
            .filter(|e| {
                eyes.iter()
                    .any(|(p, radius)| p.distance_2d(&e.position) <= *radius)
            })
            .map(|e| e.id)
            .collect();
        for id in seen {
            if let Some(sighting) = self.hidden.remove(&id) {
                trace!(enemy = %id, def = %sighting.def, "hidden enemy spotted");
                self.enemies.insert(id, sighting.clone());
                self.pending.push(GameEvent::EnemySighted(sighting));
            }
        }
    }

    fn step_unit(&mut self, id: UnitId, delta: f64) {
        let Some(order) = self.units.get(&id).and_then(|u| u.order.clone()) else {
            return;
        };
        match order {
            Command::Move { position } => {
                let speed = self.move_speed;
                let Some(unit) = self.units.get_mut(&id) else { return };
                let dist = unit.position.distance_2d(&position);
                let travel = speed * delta;
                if dist <= travel {
                    unit.position = position;
                    unit.order = None;
                    self.pending.push(GameEvent::UnitIdle { unit: id });
                } else {
                    let f = travel / dist;
                    unit.position.x += (position.x - unit.position.x) * f;
                    unit.position.z += (position.z - unit.position.z) * f;
                }
            }
            Command::Build { def, position } => {
                let building = self.units.get(&id).and_then(|u| u.building);
                match building {
                    None => {
                        let site = self.allocate_id();
                        self.units.insert(
                            site,
                            SandboxUnit {
                                def: def.clone(),
                                position,
                                order: None,
                                building: None,
                                progress: Some(0.0),
                            },
                        );
                        if let Some(unit) = self.units.get_mut(&id) {
                            unit.building = Some(site);
                        }
                        trace!(builder = %id, site = %site, def = %def, "construction started");
                        self.pending.push(GameEvent::UnitCreated {
                            unit: site,
                            def,
                            builder: Some(id),
                            position,
                        });
                    }
                    Some(site) => self.progress_construction(id, site, delta),
                }
            }
            Command::Repair { target } => self.progress_construction(id, target, delta),
            Command::Attack { .. } | Command::Stop => {}
        }
    }

    fn progress_construction(&mut self, builder: UnitId, site: UnitId, delta: f64) {
        let rate = delta / self.build_seconds.max(f64::EPSILON);
        let finished = match self.units.get_mut(&site) {
            Some(target) => match target.progress {
                Some(p) if p + rate >= 1.0 => {
                    target.progress = None;
                    true
                }
                Some(p) => {
                    target.progress = Some(p + rate);
                    false
                }
                None => true,
            },
            None => {
                if let Some(unit) = self.units.get_mut(&builder) {
                    unit.order = None;
                    unit.building = None;
                }
                self.pending.push(GameEvent::UnitIdle { unit: builder });
                return;
            }
        };
        if finished {
            if let Some(unit) = self.units.get_mut(&builder) {
                unit.order = None;
                unit.building = None;
            }
            self.pending.push(GameEvent::UnitFinished { unit: site });
            self.pending.push(GameEvent::UnitIdle { unit: builder });
        }
    }
}

impl World for SandboxWorld {
    fn game_time(&self) -> f64 {
        self.time
    }

    fn delta_time(&self) -> f64 {
        self.delta
    }

    fn resource_current(&self, resource: Resource) -> f64 {
        self.resources.get(&resource).map(|l| l.current).unwrap_or(0.0)
    }

    fn resource_income(&self, resource: Resource) -> f64 {
        self.resources.get(&resource).map(|l| l.income).unwrap_or(0.0)
    }

    fn resource_storage(&self, resource: Resource) -> f64 {
        self.resources.get(&resource).map(|l| l.storage).unwrap_or(0.0)
    }

    fn unit_def(&self, unit: UnitId) -> Option<&str> {
        self.units
            .get(&unit)
            .map(|u| u.def.as_str())
            .or_else(|| self.enemies.get(&unit).map(|e| e.def.as_str()))
    }

    fn unit_position(&self, unit: UnitId) -> Option<Position> {
        self.units
            .get(&unit)
            .map(|u| u.position)
            .or_else(|| self.enemies.get(&unit).map(|e| e.position))
    }

    fn is_unit_alive(&self, unit: UnitId) -> bool {
        self.units.contains_key(&unit)
    }

    fn visible_enemies(&self) -> Vec<EnemySighting> {
        self.enemies.values().cloned().collect()
    }

    fn can_build(&self, producer: &str, target: &str) -> bool {
        self.catalog.can_build(producer, target)
    }

    fn extraction_spots(&self) -> Vec<Position> {
        self.spots.clone()
    }

    fn find_build_position(&self, def: &str, near: Position) -> Option<Position> {
        self.catalog.get(def)?;
        Some(Position::new(near.x + 64.0, near.y, near.z))
    }

    fn elevation(&self, _x: f64, _z: f64) -> f64 {
        0.0
    }

    fn command(&mut self, unit: UnitId, command: Command) -> Result<(), CommandError> {
        let Some(state) = self.units.get_mut(&unit) else {
            return Err(CommandError::UnknownUnit(unit));
        };
        if self.reject_commands {
            return Err(CommandError::Rejected {
                unit,
                command: command.name(),
                reason: "commands disabled".to_string(),
            });
        }
        if let Command::Build { def, .. } = &command {
            if !self.catalog.can_build(&state.def, def) {
                return Err(CommandError::Rejected {
                    unit,
                    command: command.name(),
                    reason: format!("{} cannot build {}", state.def, def),
                });
            }
            state.building = None;
        }
        state.order = match &command {
            Command::Stop => None,
            other => Some(other.clone()),
        };
        self.command_log.push((unit, command));
        Ok(())
    }
}
