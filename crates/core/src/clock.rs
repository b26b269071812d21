use serde::Serialize;

use crate::world::World;

/// Game time bookkeeping, refreshed from the world once per frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameClock {
    now: f64,
    delta: f64,
    frames: u64,
    initial_build_at: Option<f64>,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, world: &dyn World) {
        self.now = world.game_time();
        self.delta = world.delta_time().max(0.0);
        self.frames += 1;
    }

    pub fn seconds(&self) -> f64 {
        self.now
    }

    pub fn minutes(&self) -> f64 {
        self.now / 60.0
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Record that the opening build order is done. Only the first call counts.
    pub fn mark_initial_build(&mut self) {
        if self.initial_build_at.is_none() {
            self.initial_build_at = Some(self.now);
        }
    }

    pub fn initial_build_done(&self) -> bool {
        self.initial_build_at.is_some()
    }

    /// Seconds since the opening build order finished, 0 before that.
    pub fn seconds_since_initial_build(&self) -> f64 {
        self.initial_build_at
            .map(|at| (self.now - at).max(0.0))
            .unwrap_or(0.0)
    }

    pub fn minutes_since_initial_build(&self) -> f64 {
        self.seconds_since_initial_build() / 60.0
    }
}
