use skirmish_core::{GameEvent, World};
use tracing::trace;

use super::core::{Deferred, TaskHandler};

impl TaskHandler {
    /// Route `event` to every tracked task subscribed to its kind.
    /// Returns the number of tasks it was delivered to.
    pub fn dispatch_event(&mut self, world: &mut dyn World, event: &GameEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for id in self.events.listeners(kind) {
            if !self.is_tracked(id) {
                continue;
            }
            self.call_or_defer(world, id, Deferred::Event(event.clone()));
            delivered += 1;
        }
        trace!(?kind, delivered, "event dispatched to tasks");
        delivered
    }
}
