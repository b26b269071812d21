//! Game events and kind-based subscription.
//!
//! Listeners state the kinds they care about when they subscribe; dispatch
//! only visits subscribers of the event's kind.

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::ids::UnitId;
use crate::world::EnemySighting;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// An owned unit started construction (or spawned).
    UnitCreated {
        unit: UnitId,
        def: String,
        builder: Option<UnitId>,
        position: Position,
    },
    UnitFinished {
        unit: UnitId,
    },
    UnitDestroyed {
        unit: UnitId,
        def: String,
        position: Position,
        attacker: Option<UnitId>,
    },
    /// An owned unit has no more orders.
    UnitIdle {
        unit: UnitId,
    },
    /// The engine could not carry out the last command of a unit.
    CommandFailed {
        unit: UnitId,
    },
    EnemySighted(EnemySighting),
    EnemyLost {
        enemy: UnitId,
    },
    EnemyDestroyed {
        enemy: UnitId,
        def: String,
        position: Position,
        attacker: Option<UnitId>,
    },
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::UnitCreated { .. } => EventKind::UnitCreated,
            GameEvent::UnitFinished { .. } => EventKind::UnitFinished,
            GameEvent::UnitDestroyed { .. } => EventKind::UnitDestroyed,
            GameEvent::UnitIdle { .. } => EventKind::UnitIdle,
            GameEvent::CommandFailed { .. } => EventKind::CommandFailed,
            GameEvent::EnemySighted(_) => EventKind::EnemySighted,
            GameEvent::EnemyLost { .. } => EventKind::EnemyLost,
            GameEvent::EnemyDestroyed { .. } => EventKind::EnemyDestroyed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    UnitCreated,
    UnitFinished,
    UnitDestroyed,
    UnitIdle,
    CommandFailed,
    EnemySighted,
    EnemyLost,
    EnemyDestroyed,
}

/// Subscription table mapping listeners to the event kinds they accept.
#[derive(Debug, Clone)]
pub struct EventBus<L> {
    subscriptions: Vec<(L, Vec<EventKind>)>,
}

impl<L> Default for EventBus<L> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }
}

impl<L: Clone + PartialEq> EventBus<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kinds`. Subscribing again replaces the kinds.
    pub fn subscribe(&mut self, listener: L, kinds: &[EventKind]) {
        if kinds.is_empty() {
            self.unsubscribe(&listener);
            return;
        }
        match self.subscriptions.iter_mut().find(|(l, _)| *l == listener) {
            Some((_, existing)) => *existing = kinds.to_vec(),
            None => self.subscriptions.push((listener, kinds.to_vec())),
        }
    }

    pub fn unsubscribe(&mut self, listener: &L) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|(l, _)| l != listener);
        self.subscriptions.len() != before
    }

    /// Listeners of `kind`, in subscription order.
    pub fn listeners(&self, kind: EventKind) -> Vec<L> {
        self.subscriptions
            .iter()
            .filter(|(_, kinds)| kinds.contains(&kind))
            .map(|(l, _)| l.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_only_reaches_matching_kinds() {
        let mut bus = EventBus::new();
        bus.subscribe("registry", &[EventKind::UnitCreated, EventKind::UnitDestroyed]);
        bus.subscribe("threat", &[EventKind::EnemySighted]);

        assert_eq!(bus.listeners(EventKind::UnitCreated), vec!["registry"]);
        assert_eq!(bus.listeners(EventKind::EnemySighted), vec!["threat"]);
        assert!(bus.listeners(EventKind::UnitIdle).is_empty());
    }

    #[test]
    fn resubscribe_replaces_kinds() {
        let mut bus = EventBus::new();
        bus.subscribe(1u32, &[EventKind::UnitIdle]);
        bus.subscribe(1u32, &[EventKind::UnitFinished]);
        assert_eq!(bus.len(), 1);
        assert!(bus.listeners(EventKind::UnitIdle).is_empty());
        assert_eq!(bus.listeners(EventKind::UnitFinished), vec![1]);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let mut bus = EventBus::new();
        bus.subscribe(7u32, &[EventKind::UnitIdle]);
        assert!(bus.unsubscribe(&7));
        assert!(!bus.unsubscribe(&7));
        assert!(bus.is_empty());
    }

    #[test]
    fn event_kind_matches_variant() {
        let e = GameEvent::UnitIdle { unit: UnitId(3) };
        assert_eq!(e.kind(), EventKind::UnitIdle);
    }
}
