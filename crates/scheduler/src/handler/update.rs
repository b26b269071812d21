use std::collections::HashSet;

use skirmish_core::World;
use tracing::{debug, trace};

use super::core::{EntryState, TaskHandler};
use crate::types::TaskId;

impl TaskHandler {
    /// Advance the scheduling pass by `delta` seconds of game time.
    ///
    /// A pass visits a snapshot of the active list, spending
    /// `split_load_time / len` seconds per task. The call that starts a pass
    /// only takes the snapshot. A task whose stored status is terminal has
    /// its observers notified when its turn comes, and is removed at the end
    /// of that call.
    pub fn update(&mut self, world: &mut dyn World, delta: f64) {
        let mut finished: Vec<TaskId> = Vec::new();

        if self.cursor >= self.snapshot.len() {
            self.accumulator = 0.0;
            self.snapshot = self.active.clone();
            self.cursor = 0;
            self.recently_halted.clear();
            if !self.snapshot.is_empty() {
                self.per_task = self.split_load_time / self.snapshot.len() as f64;
            }
            self.metrics.passes += 1;
            trace!(
                tasks = self.snapshot.len(),
                per_task = self.per_task,
                "scheduling pass started"
            );
        } else {
            self.accumulator += delta.max(0.0);

            while self.cursor < self.snapshot.len() && self.accumulator >= self.per_task {
                self.accumulator -= self.per_task;
                let id = self.snapshot[self.cursor];
                self.cursor += 1;

                if self.recently_halted.contains(&id) || !self.is_active(id) {
                    continue;
                }
                let Some(entry) = self.entries.get(&id) else {
                    continue;
                };
                let (kind, status) = (entry.kind, entry.status);

                if status.is_terminal() {
                    finished.push(id);
                    self.notify_observers(world, id, status);
                } else if let Some(status) = self.with_task(world, id, |t, ctx| t.execute(ctx)) {
                    self.metrics.record_execution(kind);
                    if let Some(entry) = self.entries.get_mut(&id).filter(|e| !e.removed) {
                        entry.status = status;
                    }
                }
            }
        }

        if !finished.is_empty() {
            let done: HashSet<TaskId> = finished.iter().copied().collect();
            self.active.retain(|id| !done.contains(id));
            for id in finished {
                if let Some(entry) = self.entries.get_mut(&id) {
                    if entry.state == EntryState::Active {
                        entry.state = EntryState::Idle;
                    }
                }
                self.release(id);
            }
            debug!(active = self.active.len(), "finished tasks removed");
        }
    }
}
