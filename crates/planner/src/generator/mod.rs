//! Ranked build list.
//!
//! Every evaluation replaces the list: each buildable catalog entry gets the
//! best score among its groups, entries under the must-have floor are
//! dropped and the rest are sorted by score, catalog order breaking ties.
//! A single escalation pass may then force a producer to the top when
//! nothing owned can build the current favourite.
//!
//! Split across submodules:
//! - `economic`: resource structures
//! - `military`: threat matrices, attack force and static defenses
//! - `support`: factories, mobile builders, scouts

mod economic;
mod military;
mod support;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use serde::Serialize;
use skirmish_core::tuning::{PriorityTuning, SpecialDefs};
use skirmish_core::{
    ArmorDamageMatrix, ArmorType, DamageType, GameClock, Resource, Tuning, UnitCatalog, UnitDef,
    UnitGroup, World,
};
use skirmish_scheduler::TaskUnitHandler;
use tracing::{debug, info};

use crate::extraction::ExtractionPointMap;
use crate::threat::SightedEnemies;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub def: String,
    pub score: f64,
    /// Raised to the force-build score by escalation.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub forced: bool,
}

/// Incomes right after the opening build order, subtracted from later
/// readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IncomeBaseline {
    pub metal: f64,
    pub energy: f64,
}

impl IncomeBaseline {
    pub fn capture(world: &dyn World) -> Self {
        Self {
            metal: world.resource_income(Resource::Metal),
            energy: world.resource_income(Resource::Energy),
        }
    }
}

/// Economy and time readings one evaluation works from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EconomyState {
    pub minutes_since_initial_build: f64,
    pub game_minutes: f64,
    pub metal_current: f64,
    /// Above the baseline.
    pub metal_income: f64,
    /// Above the baseline.
    pub energy_income: f64,
}

impl EconomyState {
    pub fn read(world: &dyn World, clock: &GameClock, baseline: &IncomeBaseline) -> Self {
        Self {
            minutes_since_initial_build: clock.minutes_since_initial_build(),
            game_minutes: clock.minutes(),
            metal_current: world.resource_current(Resource::Metal),
            metal_income: world.resource_income(Resource::Metal) - baseline.metal,
            energy_income: world.resource_income(Resource::Energy) - baseline.energy,
        }
    }
}

/// Everything scoring reads. Nothing here is mutated by the generator.
pub struct PriorityInputs<'a> {
    pub catalog: &'a UnitCatalog,
    pub units: &'a TaskUnitHandler,
    pub threat: &'a SightedEnemies,
    pub extraction: &'a ExtractionPointMap,
    pub economy: EconomyState,
}

#[derive(Debug, Clone)]
pub struct PriorityGenerator {
    tuning: PriorityTuning,
    special: SpecialDefs,
    matrix: ArmorDamageMatrix,
    damage_axis: HashMap<DamageType, f64>,
    armor_axis: HashMap<ArmorType, f64>,
    armored_building: HashMap<DamageType, f64>,
    ranked: Vec<RankedEntry>,
    /// Producer type -> seconds since initial build when it was last forced.
    last_forced: HashMap<String, f64>,
    last_evaluation: f64,
    evaluations: u64,
}

impl PriorityGenerator {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            tuning: tuning.priority.clone(),
            special: tuning.special_defs.clone(),
            matrix: tuning.matrix.clone(),
            damage_axis: HashMap::new(),
            armor_axis: HashMap::new(),
            armored_building: HashMap::new(),
            ranked: Vec::new(),
            last_forced: HashMap::new(),
            last_evaluation: 0.0,
            evaluations: 0,
        }
    }

    /// Whether the evaluation interval has passed. `now` is seconds since
    /// the initial build.
    pub fn is_due(&self, now: f64) -> bool {
        now - self.last_evaluation > self.tuning.evaluation_interval_seconds
    }

    pub fn mark_evaluated(&mut self, now: f64) {
        self.last_evaluation = now;
    }

    pub fn ranked(&self) -> &[RankedEntry] {
        &self.ranked
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Recompute the ranked list from scratch.
    pub fn generate(&mut self, inputs: &PriorityInputs<'_>) -> &[RankedEntry] {
        self.refresh_threat_matrices(inputs.threat);

        let floor = self.tuning.must_have;
        let mut ranked: Vec<RankedEntry> = inputs
            .catalog
            .iter()
            .filter(|def| def.buildable)
            .map(|def| RankedEntry {
                def: def.name.clone(),
                score: self.score(def, inputs),
                forced: false,
            })
            .filter(|entry| entry.score >= floor)
            .collect();
        sort_ranked(&mut ranked);
        self.escalate(inputs, &mut ranked);

        self.evaluations += 1;
        debug!(
            entries = ranked.len(),
            top = ranked.first().map(|e| e.def.as_str()).unwrap_or("-"),
            score = ranked.first().map(|e| e.score).unwrap_or(0.0),
            "build priorities generated"
        );
        self.ranked = ranked;
        &self.ranked
    }

    /// Best score among the groups of `def`.
    pub fn score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let economy_only =
            inputs.economy.minutes_since_initial_build < self.tuning.economics_only_minutes;
        def.groups
            .iter()
            .map(|group| {
                if economy_only && *group != UnitGroup::Economic {
                    0.0
                } else {
                    self.group_score(*group, def, inputs)
                }
            })
            .fold(0.0, f64::max)
    }

    fn group_score(&self, group: UnitGroup, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        match group {
            UnitGroup::Economic => self.economic_score(def, inputs),
            UnitGroup::AttackForce => self.attack_force_score(def, inputs),
            UnitGroup::ArmoredBuilding => self.armored_building_score(def, inputs),
            UnitGroup::Factory => self.factory_score(def, inputs),
            UnitGroup::MobileBuilder => self.mobile_builder_score(def, inputs),
            UnitGroup::Scout => self.scout_score(inputs),
            UnitGroup::Builder | UnitGroup::Building | UnitGroup::Healer => 0.0,
        }
    }

    /// Force the best-ranked producer of the top entry when metal is short
    /// and no owned builder, idle or busy, can build it. Returns the forced
    /// producer type.
    pub(crate) fn escalate(
        &mut self,
        inputs: &PriorityInputs<'_>,
        ranked: &mut [RankedEntry],
    ) -> Option<String> {
        let top = ranked.first()?.def.clone();
        if inputs.economy.metal_current >= self.tuning.builder_new_min_metal {
            return None;
        }
        let units = inputs.units;
        let owned_can_build = units
            .units_by_group(UnitGroup::Builder)
            .iter()
            .filter_map(|id| units.get(*id))
            .any(|unit| inputs.catalog.can_build(unit.def(), &top));
        if owned_can_build {
            return None;
        }

        let catalog = inputs.catalog;
        let index = ranked.iter().position(|entry| {
            catalog.get(&entry.def).and_then(UnitDef::primary_group) == Some(UnitGroup::Builder)
                && catalog.can_build(&entry.def, &top)
        })?;
        let producer = ranked[index].def.clone();

        let now = inputs.economy.minutes_since_initial_build * 60.0;
        if let Some(last) = self.last_forced.get(&producer) {
            if now - last <= self.tuning.builder_wait_seconds {
                debug!(%producer, %top, since = now - last, "force build cooling down");
                return None;
            }
        }

        ranked[index].score = self.tuning.force_build;
        ranked[index].forced = true;
        self.last_forced.insert(producer.clone(), now);
        sort_ranked(ranked);
        info!(%producer, %top, "forcing producer to the top of the build list");
        Some(producer)
    }
}

/// Descending by score. Stable, so equal scores keep catalog order.
fn sort_ranked(ranked: &mut [RankedEntry]) {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Units of `def` started but not finished.
fn under_construction(units: &TaskUnitHandler, def: &str) -> f64 {
    units.nr_all(def).saturating_sub(units.nr_finished(def)) as f64
}
