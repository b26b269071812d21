//! Scouting run: one unit visits a list of positions, closest first, then
//! flies back to where it started.

use skirmish_core::{EventKind, GameEvent, Position, UnitId};
use tracing::{debug, info};

use crate::task::{Task, TaskContext};
use crate::tasks::move_to::MoveCloseTo;
use crate::types::{Status, TaskId, TaskPriority};

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::EnemySighted];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoutSettings {
    /// A position counts as scouted once the unit is this close.
    pub sight_radius: f64,
    /// Distance from the starting point that counts as home.
    pub home_radius: f64,
    pub move_timeout: f64,
}

#[derive(Debug, Clone)]
pub struct ScoutTask {
    scout: UnitId,
    targets: Vec<Position>,
    settings: ScoutSettings,
    home: Option<Position>,
    current: Option<TaskId>,
    /// The current move reached its position.
    arrived: bool,
    returning: bool,
    visited: usize,
    sighted: usize,
    started: bool,
    done: bool,
    failed: bool,
}

impl ScoutTask {
    pub const KIND: &'static str = "scout";

    pub fn new(scout: UnitId, targets: Vec<Position>, settings: ScoutSettings) -> Self {
        Self {
            scout,
            targets,
            settings,
            home: None,
            current: None,
            arrived: false,
            returning: false,
            visited: 0,
            sighted: 0,
            started: false,
            done: false,
            failed: false,
        }
    }

    pub fn scout(&self) -> UnitId {
        self.scout
    }

    /// Positions not visited yet.
    pub fn remaining(&self) -> &[Position] {
        &self.targets
    }

    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Enemies that came into view while this run was going.
    pub fn sighted(&self) -> usize {
        self.sighted
    }

    pub fn is_returning(&self) -> bool {
        self.returning
    }

    fn move_to(&mut self, ctx: &mut TaskContext<'_>, to: Position, radius: f64) -> bool {
        let task = MoveCloseTo::new(self.scout, to, radius, self.settings.move_timeout);
        match ctx.spawn_child_on_unit(Box::new(task), self.scout, TaskPriority::Medium) {
            Some(child) => {
                self.current = Some(child);
                true
            }
            None => false,
        }
    }

    /// Head for the closest position left. Returns false when there is
    /// none or the move could not start.
    fn next_target(&mut self, ctx: &mut TaskContext<'_>) -> bool {
        let Some(from) = ctx.world.unit_position(self.scout) else {
            return false;
        };
        let Some(index) = self
            .targets
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_2d(&from).total_cmp(&b.distance_2d(&from)))
            .map(|(i, _)| i)
        else {
            return false;
        };
        let target = self.targets.remove(index);
        debug!(scout = %self.scout, %target, left = self.targets.len(), "scouting next position");
        self.move_to(ctx, target, self.settings.sight_radius)
    }

    fn go_home(&mut self, ctx: &mut TaskContext<'_>) -> bool {
        let Some(home) = self.home else {
            return false;
        };
        self.returning = true;
        self.move_to(ctx, home, self.settings.home_radius)
    }
}

impl Task for ScoutTask {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        if self.failed || !ctx.world.is_unit_alive(self.scout) {
            return Status::FailedUnexpected;
        }
        if self.done {
            info!(scout = %self.scout, visited = self.visited, sighted = self.sighted, "scouting finished");
            return Status::Completed;
        }

        if !self.started {
            self.started = true;
            self.home = ctx.world.unit_position(self.scout);
            if !self.next_target(ctx) {
                debug!(scout = %self.scout, "nothing to scout");
                return Status::FailedClean;
            }
            return Status::Executing;
        }

        if self.arrived {
            self.arrived = false;
            if !self.next_target(ctx) && !self.go_home(ctx) {
                return Status::FailedUnexpected;
            }
        }
        Status::Executing
    }

    fn halt(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(child) = self.current {
            ctx.halt(child);
        }
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) {
        if let Some(child) = self.current {
            ctx.resume(child);
        }
    }

    fn on_task_finished(&mut self, _ctx: &mut TaskContext<'_>, finished: TaskId, status: Status) {
        if self.current != Some(finished) {
            return;
        }
        self.current = None;
        match (status, self.returning) {
            (Status::Completed, true) => self.done = true,
            // The next move starts on the next turn, once this one has left
            // the unit slot.
            (Status::Completed, false) => {
                self.visited += 1;
                self.arrived = true;
            }
            _ => self.failed = true,
        }
    }

    fn subscriptions(&self) -> &[EventKind] {
        SUBSCRIPTIONS
    }

    fn on_event(&mut self, ctx: &mut TaskContext<'_>, event: &GameEvent) {
        let GameEvent::EnemySighted(sighting) = event else {
            return;
        };
        let near = ctx
            .world
            .unit_position(self.scout)
            .is_some_and(|p| p.distance_2d(&sighting.position) <= self.settings.sight_radius);
        if near {
            self.sighted += 1;
            debug!(scout = %self.scout, enemy = %sighting.id, def = %sighting.def, "scout spotted enemy");
        }
    }

    fn cancel(&mut self, ctx: &mut TaskContext<'_>) {
        self.targets.clear();
        if let Some(child) = self.current.take() {
            ctx.remove(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::{SandboxWorld, UnitCatalog, World};

    use super::*;
    use crate::handler::TaskHandler;
    use crate::types::Observer;

    fn settings() -> ScoutSettings {
        ScoutSettings {
            sight_radius: 900.0,
            home_radius: 100.0,
            move_timeout: 120.0,
        }
    }

    fn setup() -> (TaskHandler, SandboxWorld, UnitId) {
        let catalog = UnitCatalog::bundled().unwrap();
        let mut world = SandboxWorld::new(catalog.clone());
        world.move_speed = 400.0;
        let mut handler = TaskHandler::with_split_load_time(0.1);
        let scout = world.spawn_unit("scout_plane", Position::flat(0.0, 0.0));
        let def = catalog.require("scout_plane").unwrap();
        handler.units_mut().unit_created(scout, def, None);
        handler.units_mut().unit_finished(scout);
        world.drain_events();
        (handler, world, scout)
    }

    fn drive(handler: &mut TaskHandler, world: &mut SandboxWorld, ticks: usize) {
        for _ in 0..ticks {
            for event in world.step(0.1) {
                handler.dispatch_event(world, &event);
            }
            handler.update(world, 0.1);
        }
    }

    fn start(handler: &mut TaskHandler, scout: UnitId, targets: Vec<Position>) -> TaskId {
        let listener = handler.register_listener();
        let id = handler.insert(Box::new(ScoutTask::new(scout, targets, settings())));
        let observer = Some(Observer::Listener(listener));
        assert!(handler.run_high_level(id, observer, &[scout], TaskPriority::Medium));
        id
    }

    #[test]
    fn visits_closest_position_first_then_returns_home() {
        let (mut handler, mut world, scout) = setup();
        let far = Position::flat(3000.0, 0.0);
        let near = Position::flat(1000.0, 0.0);
        let task = start(&mut handler, scout, vec![far, near]);

        drive(&mut handler, &mut world, 10);
        let run = handler.task_ref::<ScoutTask>(task).unwrap();
        assert_eq!(run.remaining(), &[far]);
        assert!(!handler.units().get(scout).unwrap().is_free());

        drive(&mut handler, &mut world, 600);
        let notes = handler.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::Completed);
        let home = world.unit_position(scout).unwrap();
        assert!(home.distance_2d(&Position::flat(0.0, 0.0)) <= 100.0);
        assert!(handler.units().get(scout).unwrap().is_free());
        assert_eq!(handler.nr_of_tasks(MoveCloseTo::KIND), 0);
    }

    #[test]
    fn empty_route_fails_cleanly() {
        let (mut handler, mut world, scout) = setup();
        start(&mut handler, scout, Vec::new());

        drive(&mut handler, &mut world, 5);
        let notes = handler.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::FailedClean);
        assert!(handler.units().get(scout).unwrap().is_free());
    }

    #[test]
    fn lost_scout_fails_the_run() {
        let (mut handler, mut world, scout) = setup();
        start(&mut handler, scout, vec![Position::flat(4000.0, 0.0)]);
        drive(&mut handler, &mut world, 5);

        world.destroy_unit(scout);
        drive(&mut handler, &mut world, 10);

        let notes = handler.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::FailedUnexpected);
    }

    #[test]
    fn counts_enemies_revealed_along_the_way() {
        let (mut handler, mut world, scout) = setup();
        world.add_hidden_enemy("metal_extractor", Position::flat(1500.0, 0.0));
        let task = start(&mut handler, scout, vec![Position::flat(4000.0, 0.0)]);

        drive(&mut handler, &mut world, 40);
        let run = handler.task_ref::<ScoutTask>(task).unwrap();
        assert_eq!(run.sighted(), 1);
        assert_eq!(world.visible_enemies().len(), 1);
    }
}
