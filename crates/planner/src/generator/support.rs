use skirmish_core::{UnitDef, UnitGroup};

use super::{PriorityGenerator, PriorityInputs};

impl PriorityGenerator {
    /// One more factory every `factory_minutes_per` minutes of game time.
    pub(super) fn factory_score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let owned = inputs.units.nr_all(&def.name) as f64;
        p.builder_priority_min
            + p.factory_priority * (inputs.economy.game_minutes / p.factory_minutes_per - owned)
    }

    pub(super) fn mobile_builder_score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let mut score = p.builder_priority_min;
        if def.name == self.special.flying_builder {
            let owned = inputs.units.nr_all(&def.name) as f64;
            score += p.builder_flying_priority
                * (inputs.economy.game_minutes / p.builder_minutes_per_flying - owned);
        }
        score
    }

    pub(super) fn scout_score(&self, inputs: &PriorityInputs<'_>) -> f64 {
        if inputs.units.units_by_group(UnitGroup::Scout).len() < self.tuning.scouts_min {
            self.tuning.force_build
        } else {
            0.0
        }
    }
}
