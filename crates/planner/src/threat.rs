//! Memory of hostile units and the threat they add up to.
//!
//! Every known enemy contributes its max health to the armor bucket and its
//! DPS to the damage bucket of each group its type belongs to. The priority
//! generator reads these aggregates to decide what to build.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use skirmish_core::tuning::ThreatTuning;
use skirmish_core::{
    ArmorType, DamageType, EnemySighting, Position, UnitCatalog, UnitGroup, UnitId,
};
use tracing::{debug, trace};

/// Classification of a known enemy type, copied from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyProfile {
    pub groups: Vec<UnitGroup>,
    pub armor: ArmorType,
    pub damage: Option<DamageType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enemy {
    pub id: UnitId,
    pub def: String,
    /// Last known position.
    pub position: Position,
    pub last_seen: f64,
    pub max_health: f64,
    pub dps: f64,
    pub flying: bool,
    /// In line of sight right now.
    pub visible: bool,
    /// `None` for types missing from the catalog.
    pub profile: Option<EnemyProfile>,
}

#[derive(Debug, Clone)]
pub struct SightedEnemies {
    enemies: BTreeMap<UnitId, Enemy>,
    armor_health: HashMap<(UnitGroup, ArmorType), f64>,
    damage_dps: HashMap<(UnitGroup, DamageType), f64>,
    flying_health: f64,
    last_seen_timelimit: f64,
}

impl SightedEnemies {
    pub fn new(tuning: &ThreatTuning) -> Self {
        Self {
            enemies: BTreeMap::new(),
            armor_health: HashMap::new(),
            damage_dps: HashMap::new(),
            flying_health: 0.0,
            last_seen_timelimit: tuning.last_seen_timelimit,
        }
    }

    /// Record a sighting. Known enemies only get their position and
    /// last-seen time refreshed.
    pub fn enemy_sighted(&mut self, catalog: &UnitCatalog, sighting: &EnemySighting, now: f64) {
        if let Some(enemy) = self.enemies.get_mut(&sighting.id) {
            enemy.position = sighting.position;
            enemy.last_seen = now;
            enemy.visible = true;
            return;
        }

        let profile = catalog.get(&sighting.def).map(|def| EnemyProfile {
            groups: def.groups.clone(),
            armor: def.armor,
            damage: def.damage,
        });
        if profile.is_none() {
            debug!(enemy = %sighting.id, def = %sighting.def, "enemy type not in catalog");
        }
        let enemy = Enemy {
            id: sighting.id,
            def: sighting.def.clone(),
            position: sighting.position,
            last_seen: now,
            max_health: sighting.max_health,
            dps: sighting.dps,
            flying: sighting.flying,
            visible: true,
            profile,
        };
        self.add_contribution(&enemy);
        trace!(enemy = %enemy.id, def = %enemy.def, known = self.enemies.len() + 1, "enemy sighted");
        self.enemies.insert(enemy.id, enemy);
    }

    /// The enemy left line of sight. Its last known position is kept.
    pub fn enemy_lost(&mut self, id: UnitId) -> bool {
        match self.enemies.get_mut(&id) {
            Some(enemy) => {
                enemy.visible = false;
                true
            }
            None => false,
        }
    }

    pub fn enemy_destroyed(&mut self, id: UnitId) -> Option<Enemy> {
        let enemy = self.enemies.remove(&id)?;
        self.remove_contribution(&enemy);
        debug!(enemy = %id, def = %enemy.def, remaining = self.enemies.len(), "enemy destroyed");
        Some(enemy)
    }

    /// Refresh every visible enemy, then forget the ones not seen for
    /// longer than the time limit. Returns how many were forgotten.
    pub fn refresh(&mut self, catalog: &UnitCatalog, visible: &[EnemySighting], now: f64) -> usize {
        for sighting in visible {
            self.enemy_sighted(catalog, sighting, now);
        }

        let limit = self.last_seen_timelimit;
        let expired: Vec<UnitId> = self
            .enemies
            .values()
            .filter(|e| now - e.last_seen > limit)
            .map(|e| e.id)
            .collect();
        for id in &expired {
            if let Some(enemy) = self.enemies.remove(id) {
                self.remove_contribution(&enemy);
            }
        }
        if !expired.is_empty() {
            debug!(expired = expired.len(), remaining = self.enemies.len(), "forgot stale enemies");
        }
        expired.len()
    }

    fn add_contribution(&mut self, enemy: &Enemy) {
        if enemy.flying {
            self.flying_health += enemy.max_health;
        }
        let Some(profile) = &enemy.profile else {
            return;
        };
        for group in &profile.groups {
            *self.armor_health.entry((*group, profile.armor)).or_default() += enemy.max_health;
            if let Some(damage) = profile.damage.filter(|_| enemy.dps != 0.0) {
                *self.damage_dps.entry((*group, damage)).or_default() += enemy.dps;
            }
        }
    }

    fn remove_contribution(&mut self, enemy: &Enemy) {
        if enemy.flying {
            self.flying_health = (self.flying_health - enemy.max_health).max(0.0);
        }
        let Some(profile) = &enemy.profile else {
            return;
        };
        for group in &profile.groups {
            if let Some(health) = self.armor_health.get_mut(&(*group, profile.armor)) {
                *health = (*health - enemy.max_health).max(0.0);
            }
            if let Some(damage) = profile.damage {
                if let Some(dps) = self.damage_dps.get_mut(&(*group, damage)) {
                    *dps = (*dps - enemy.dps).max(0.0);
                }
            }
        }
    }

    /// Summed max health of known enemies in `group` wearing `armor`.
    pub fn armor_health(&self, group: UnitGroup, armor: ArmorType) -> f64 {
        self.armor_health.get(&(group, armor)).copied().unwrap_or(0.0)
    }

    /// Summed DPS of known enemies in `group` dealing `damage`.
    pub fn damage_dps(&self, group: UnitGroup, damage: DamageType) -> f64 {
        self.damage_dps.get(&(group, damage)).copied().unwrap_or(0.0)
    }

    pub fn flying_health(&self) -> f64 {
        self.flying_health
    }

    /// Closest enemy that flies when `flying` is set, or stays on the ground
    /// otherwise.
    pub fn closest_enemy(&self, from: Position, flying: bool) -> Option<&Enemy> {
        self.closest_where(from, |e| e.flying == flying)
    }

    pub fn closest_enemy_by_def(&self, from: Position, def: &str) -> Option<&Enemy> {
        self.closest_where(from, |e| e.def == def)
    }

    fn closest_where(&self, from: Position, pred: impl Fn(&Enemy) -> bool) -> Option<&Enemy> {
        self.enemies
            .values()
            .filter(|e| pred(e))
            .min_by(|a, b| {
                a.position
                    .distance_2d(&from)
                    .total_cmp(&b.position.distance_2d(&from))
            })
    }

    pub fn get(&self, id: UnitId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }
}
