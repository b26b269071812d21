//! Ownership of the map's resource extraction spots.

use serde::Serialize;
use skirmish_core::{GameEvent, Position, World};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotOwner {
    SelfOwned,
    Enemy,
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractionSpot {
    pub position: Position,
    pub owner: SpotOwner,
}

/// Every extraction spot with its current owner. `None` as an owner filter
/// means any owner.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPointMap {
    spots: Vec<ExtractionSpot>,
}

impl ExtractionPointMap {
    pub fn new(positions: Vec<Position>) -> Self {
        let spots = positions
            .into_iter()
            .map(|position| ExtractionSpot {
                position,
                owner: SpotOwner::Free,
            })
            .collect();
        Self { spots }
    }

    pub fn from_world(world: &dyn World) -> Self {
        let map = Self::new(world.extraction_spots());
        debug!(spots = map.spots.len(), "extraction spots loaded");
        map
    }

    pub fn count(&self, owner: Option<SpotOwner>) -> usize {
        self.matching(owner).count()
    }

    pub fn positions_by_owner(&self, owner: Option<SpotOwner>) -> Vec<Position> {
        self.matching(owner).map(|s| s.position).collect()
    }

    pub fn closest(&self, from: Position, owner: Option<SpotOwner>) -> Option<Position> {
        self.closest_index(from, owner).map(|i| self.spots[i].position)
    }

    /// Spots within `radius` of `from`, horizontally.
    pub fn within(&self, from: Position, owner: Option<SpotOwner>, radius: f64) -> Vec<Position> {
        self.matching(owner)
            .filter(|s| s.position.distance_2d(&from) <= radius)
            .map(|s| s.position)
            .collect()
    }

    pub fn spots(&self) -> &[ExtractionSpot] {
        &self.spots
    }

    /// Give the spot closest to `position` a new owner.
    pub fn set_owner_near(&mut self, position: Position, owner: SpotOwner) -> bool {
        match self.closest_index(position, None) {
            Some(i) => {
                self.spots[i].owner = owner;
                true
            }
            None => {
                warn!(%position, "no extraction spot to claim");
                false
            }
        }
    }

    /// Track extractors built or lost by either side. Returns whether an
    /// owner changed.
    pub fn handle_event(&mut self, event: &GameEvent, extractor_def: &str) -> bool {
        let (position, owner) = match event {
            GameEvent::UnitCreated { def, position, .. } if def == extractor_def => {
                (*position, SpotOwner::SelfOwned)
            }
            GameEvent::UnitDestroyed { def, position, .. } if def == extractor_def => {
                (*position, SpotOwner::Free)
            }
            GameEvent::EnemySighted(sighting) if sighting.def == extractor_def => {
                (sighting.position, SpotOwner::Enemy)
            }
            GameEvent::EnemyDestroyed { def, position, .. } if def == extractor_def => {
                (*position, SpotOwner::Free)
            }
            _ => return false,
        };
        let changed = self.set_owner_near(position, owner);
        if changed {
            debug!(
                %position,
                ?owner,
                own = self.count(Some(SpotOwner::SelfOwned)),
                free = self.count(Some(SpotOwner::Free)),
                "extraction spot changed owner"
            );
        }
        changed
    }

    fn matching(&self, owner: Option<SpotOwner>) -> impl Iterator<Item = &ExtractionSpot> {
        self.spots
            .iter()
            .filter(move |s| owner.map_or(true, |o| s.owner == o))
    }

    fn closest_index(&self, from: Position, owner: Option<SpotOwner>) -> Option<usize> {
        self.spots
            .iter()
            .enumerate()
            .filter(|(_, s)| owner.map_or(true, |o| s.owner == o))
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_2d(&from)
                    .total_cmp(&b.position.distance_2d(&from))
            })
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::{EnemySighting, UnitId};

    use super::*;

    fn map() -> ExtractionPointMap {
        ExtractionPointMap::new(vec![
            Position::flat(0.0, 0.0),
            Position::flat(100.0, 0.0),
            Position::flat(1000.0, 0.0),
        ])
    }

    fn created(def: &str, x: f64) -> GameEvent {
        GameEvent::UnitCreated {
            unit: UnitId(1),
            def: def.to_string(),
            builder: None,
            position: Position::flat(x, 0.0),
        }
    }

    #[test]
    fn counts_by_owner() {
        let mut m = map();
        assert_eq!(m.count(None), 3);
        assert_eq!(m.count(Some(SpotOwner::Free)), 3);

        assert!(m.handle_event(&created("metal_extractor", 95.0), "metal_extractor"));
        assert_eq!(m.count(Some(SpotOwner::SelfOwned)), 1);
        assert_eq!(m.count(Some(SpotOwner::Free)), 2);
        assert_eq!(
            m.positions_by_owner(Some(SpotOwner::SelfOwned)),
            vec![Position::flat(100.0, 0.0)]
        );
    }

    #[test]
    fn other_types_do_not_claim_spots() {
        let mut m = map();
        assert!(!m.handle_event(&created("storage", 0.0), "metal_extractor"));
        assert_eq!(m.count(Some(SpotOwner::Free)), 3);
    }

    #[test]
    fn enemy_extractor_lifecycle() {
        let mut m = map();
        let sighted = GameEvent::EnemySighted(EnemySighting {
            id: UnitId(50),
            def: "metal_extractor".to_string(),
            position: Position::flat(990.0, 5.0),
            max_health: 900.0,
            dps: 0.0,
            flying: false,
        });
        m.handle_event(&sighted, "metal_extractor");
        assert_eq!(
            m.closest(Position::flat(0.0, 0.0), Some(SpotOwner::Enemy)),
            Some(Position::flat(1000.0, 0.0))
        );

        let destroyed = GameEvent::EnemyDestroyed {
            enemy: UnitId(50),
            def: "metal_extractor".to_string(),
            position: Position::flat(1000.0, 0.0),
            attacker: None,
        };
        m.handle_event(&destroyed, "metal_extractor");
        assert_eq!(m.count(Some(SpotOwner::Enemy)), 0);
    }

    #[test]
    fn own_extractor_destroyed_frees_spot() {
        let mut m = map();
        m.handle_event(&created("metal_extractor", 0.0), "metal_extractor");
        let destroyed = GameEvent::UnitDestroyed {
            unit: UnitId(1),
            def: "metal_extractor".to_string(),
            position: Position::flat(0.0, 0.0),
            attacker: None,
        };
        assert!(m.handle_event(&destroyed, "metal_extractor"));
        assert_eq!(m.count(Some(SpotOwner::Free)), 3);
    }

    #[test]
    fn closest_and_within_filter_by_owner() {
        let mut m = map();
        m.set_owner_near(Position::flat(0.0, 0.0), SpotOwner::SelfOwned);
        let from = Position::flat(10.0, 0.0);
        assert_eq!(
            m.closest(from, Some(SpotOwner::Free)),
            Some(Position::flat(100.0, 0.0))
        );
        assert_eq!(m.closest(from, None), Some(Position::flat(0.0, 0.0)));
        assert_eq!(m.within(from, None, 150.0).len(), 2);
        assert_eq!(m.within(from, Some(SpotOwner::Free), 150.0).len(), 1);
    }

    #[test]
    fn empty_map_has_no_closest() {
        let mut m = ExtractionPointMap::default();
        assert_eq!(m.closest(Position::default(), None), None);
        assert!(!m.set_owner_near(Position::default(), SpotOwner::Enemy));
    }
}
