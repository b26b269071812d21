use skirmish_core::{Command, EventKind, GameEvent, Position, UnitId};
use tracing::{debug, warn};

use crate::task::{Task, TaskContext};
use crate::types::Status;

const SUBSCRIPTIONS: &[EventKind] = &[
    EventKind::UnitCreated,
    EventKind::UnitFinished,
    EventKind::UnitDestroyed,
    EventKind::UnitIdle,
    EventKind::CommandFailed,
];

/// Order one builder to construct one unit of `def`.
#[derive(Debug, Clone)]
pub struct BuildUnitTask {
    builder: UnitId,
    def: String,
    position: Option<Position>,
    construction: Option<UnitId>,
    ordered: bool,
    halted: bool,
    outcome: Option<Status>,
}

impl BuildUnitTask {
    pub const KIND: &'static str = "build_unit";

    /// Build at a position chosen near the builder.
    pub fn new(builder: UnitId, def: impl Into<String>) -> Self {
        Self {
            builder,
            def: def.into(),
            position: None,
            construction: None,
            ordered: false,
            halted: false,
            outcome: None,
        }
    }

    pub fn at(builder: UnitId, def: impl Into<String>, position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::new(builder, def)
        }
    }

    pub fn builder(&self) -> UnitId {
        self.builder
    }

    pub fn def(&self) -> &str {
        &self.def
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// The unit under construction, once the engine has created it.
    pub fn construction(&self) -> Option<UnitId> {
        self.construction
    }

    fn fail(&mut self, status: Status, reason: &str) {
        if self.outcome.is_none() {
            debug!(builder = %self.builder, def = %self.def, ?status, reason, "build failed");
            self.outcome = Some(status);
        }
    }

    fn order(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        let Some(builder_def) = ctx.world.unit_def(self.builder).map(str::to_string) else {
            return Status::FailedUnexpected;
        };
        if !ctx.world.can_build(&builder_def, &self.def) {
            debug!(builder = %self.builder, %builder_def, def = %self.def, "builder cannot build");
            return Status::FailedClean;
        }
        let position = match self.position {
            Some(p) => Some(p),
            None => ctx
                .world
                .unit_position(self.builder)
                .and_then(|near| ctx.world.find_build_position(&self.def, near)),
        };
        let Some(position) = position else {
            debug!(def = %self.def, "no build position");
            return Status::FailedClean;
        };
        self.position = Some(position);

        let command = Command::Build {
            def: self.def.clone(),
            position,
        };
        if let Err(err) = ctx.command(self.builder, command) {
            debug!(%err, "build command rejected");
            return Status::FailedClean;
        }
        self.ordered = true;
        Status::Executing
    }
}

impl Task for BuildUnitTask {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Status {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        if !ctx.world.is_unit_alive(self.builder) {
            return Status::FailedUnexpected;
        }
        if !self.ordered {
            return self.order(ctx);
        }
        Status::Executing
    }

    fn halt(&mut self, ctx: &mut TaskContext<'_>) {
        self.halted = true;
        if self.ordered && self.outcome.is_none() {
            if let Err(err) = ctx.command(self.builder, Command::Stop) {
                warn!(%err, "failed to stop builder");
            }
        }
    }

    fn resume(&mut self, ctx: &mut TaskContext<'_>) {
        self.halted = false;
        if !self.ordered || self.outcome.is_some() {
            return;
        }
        let command = match (self.construction, self.position) {
            (Some(target), _) => Command::Repair { target },
            (None, Some(position)) => Command::Build {
                def: self.def.clone(),
                position,
            },
            (None, None) => {
                self.ordered = false;
                return;
            }
        };
        if let Err(err) = ctx.command(self.builder, command) {
            warn!(%err, "failed to resume construction");
            self.fail(Status::FailedUnexpected, "resume rejected");
        }
    }

    fn subscriptions(&self) -> &[EventKind] {
        SUBSCRIPTIONS
    }

    fn on_event(&mut self, _ctx: &mut TaskContext<'_>, event: &GameEvent) {
        match event {
            GameEvent::UnitCreated {
                unit,
                def,
                builder: Some(builder),
                ..
            } if *builder == self.builder
                && *def == self.def
                && self.ordered
                && self.construction.is_none() =>
            {
                self.construction = Some(*unit);
            }
            GameEvent::UnitFinished { unit } if Some(*unit) == self.construction => {
                if self.outcome.is_none() {
                    self.outcome = Some(Status::Completed);
                }
            }
            GameEvent::UnitDestroyed { unit, .. } if *unit == self.builder => {
                self.fail(Status::FailedUnexpected, "builder destroyed");
            }
            GameEvent::UnitDestroyed { unit, .. } if Some(*unit) == self.construction => {
                self.fail(Status::FailedUnexpected, "construction destroyed");
            }
            GameEvent::UnitIdle { unit }
                if *unit == self.builder
                    && self.ordered
                    && !self.halted
                    && self.construction.is_none() =>
            {
                self.fail(Status::FailedUnexpected, "builder idle before construction");
            }
            GameEvent::CommandFailed { unit } if *unit == self.builder => {
                self.fail(Status::FailedUnexpected, "command failed");
            }
            _ => {}
        }
    }
}
