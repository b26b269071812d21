use skirmish_core::{Command, EventKind, GameEvent, Position, UnitId};
use tracing::{debug, warn};

use crate::task::{Task, TaskContext};
use crate::types::Status;

const SUBSCRIPTIONS: &[EventKind] = &[
    EventKind::UnitIdle,
    EventKind::UnitDestroyed,
    EventKind::CommandFailed,
];

/// Move a unit until it is within `radius` of `destination`.
#[derive(Debug, Clone)]
pub struct MoveCloseTo {
    unit: UnitId,
    destination: Position,
    radius: f64,
    /// Game seconds allowed while not halted.
    timeout: f64,
    started_at: Option<f64>,
    halted_at: Option<f64>,
    ordered: bool,
    failed: bool,
}

impl MoveCloseTo {
    pub const KIND: &'static str = "move_close_to";

    pub fn new(unit: UnitId, destination: Position, radius: f64, timeout: f64) -> Self {
        Self {
            unit,
            destination,
            radius,
            timeout,
            started_at: None,
            halted_at: None,
            ordered: false,
            failed: false,
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn destination(&self) -> Position {
        self.destination
    }
}

impl Task for MoveCloseTo {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        if self.failed || !ctx.world.is_unit_alive(self.unit) {
            return Status::FailedUnexpected;
        }
        let Some(position) = ctx.world.unit_position(self.unit) else {
            return Status::FailedUnexpected;
        };
        if position.distance_2d(&self.destination) <= self.radius {
            return Status::Completed;
        }

        let now = ctx.world.game_time();
        let started = *self.started_at.get_or_insert(now);
        if now - started > self.timeout {
            debug!(unit = %self.unit, destination = %self.destination, "move timed out");
            return Status::FailedUnexpected;
        }

        if !self.ordered {
            let command = Command::Move {
                position: self.destination,
            };
            if let Err(err) = ctx.command(self.unit, command) {
                debug!(%err, "move command rejected");
                return Status::FailedUnexpected;
            }
            self.ordered = true;
        }
        Status::Executing
    }

    fn halt(&mut self, ctx: &mut TaskContext<'_>) {
        self.halted_at = Some(ctx.world.game_time());
        if self.ordered {
            if let Err(err) = ctx.command(self.unit, Command::Stop) {
                warn!(%err, "failed to stop unit");
            }
            self.ordered = false;
        }
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) {
        let now = ctx.world.game_time();
        if let (Some(halted_at), Some(started)) = (self.halted_at.take(), self.started_at.as_mut()) {
            *started += (now - halted_at).max(0.0);
        }
        let command = Command::Move {
            position: self.destination,
        };
        match ctx.command(self.unit, command) {
            Ok(()) => self.ordered = true,
            Err(err) => {
                warn!(%err, "failed to resume move");
                self.failed = true;
            }
        }
    }

    fn subscriptions(&self) -> &[EventKind] {
        SUBSCRIPTIONS
    }

    fn on_event(&mut self, _ctx: &mut TaskContext<'_>, event: &GameEvent) {
        match event {
            // Stopped short, order again on the next turn.
            GameEvent::UnitIdle { unit } if *unit == self.unit && self.halted_at.is_none() => {
                self.ordered = false;
            }
            GameEvent::UnitDestroyed { unit, .. } | GameEvent::CommandFailed { unit }
                if *unit == self.unit =>
            {
                self.failed = true;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::{SandboxWorld, UnitCatalog};

    use super::*;
    use crate::handler::TaskHandler;
    use crate::types::Observer;

    fn drive(handler: &mut TaskHandler, world: &mut SandboxWorld, ticks: usize) {
        for _ in 0..ticks {
            for event in world.step(0.1) {
                handler.dispatch_event(world, &event);
            }
            handler.update(world, 0.1);
        }
    }

    #[test]
    fn arrives_within_radius() {
        let mut world = SandboxWorld::new(UnitCatalog::bundled().unwrap());
        world.move_speed = 100.0;
        let tank = world.spawn_unit("light_tank", Position::flat(0.0, 0.0));
        let mut handler = TaskHandler::with_split_load_time(0.1);
        let listener = handler.register_listener();
        handler.spawn(
            Box::new(MoveCloseTo::new(tank, Position::flat(300.0, 0.0), 50.0, 60.0)),
            Some(Observer::Listener(listener)),
        );

        drive(&mut handler, &mut world, 80);

        let notes = handler.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::Completed);
    }

    #[test]
    fn times_out_when_unit_cannot_move() {
        let mut world = SandboxWorld::new(UnitCatalog::bundled().unwrap());
        world.move_speed = 0.0;
        let tank = world.spawn_unit("light_tank", Position::flat(0.0, 0.0));
        let mut handler = TaskHandler::with_split_load_time(0.1);
        let listener = handler.register_listener();
        handler.spawn(
            Box::new(MoveCloseTo::new(tank, Position::flat(300.0, 0.0), 50.0, 2.0)),
            Some(Observer::Listener(listener)),
        );

        drive(&mut handler, &mut world, 60);

        let notes = handler.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].status, Status::FailedUnexpected);
    }
}
