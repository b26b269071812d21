use skirmish_core::UnitDef;

use super::{under_construction, PriorityGenerator, PriorityInputs};
use crate::extraction::SpotOwner;

impl PriorityGenerator {
    /// Resource structures chase an income that should grow with time.
    /// Plain economic types keep the minimum score.
    pub(super) fn economic_score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let s = &self.special;
        let mut score = p.economy_min;

        if def.name == s.fusion {
            score += self.fusion_term(inputs);
        } else if def.name == s.metal_extractor {
            score += self.extractor_term(inputs);
        } else if def.name == s.metal_maker {
            score += self.maker_term(inputs);
        } else if def.name == s.storage {
            let storages = inputs.units.nr_all(&s.storage) as f64;
            score += p.storage_priority * (inputs.economy.energy_income / p.energy_per_storage - storages);
        }

        score.min(p.economy_max)
    }

    fn fusion_term(&self, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let mut income = inputs.economy.energy_income;
        if income >= p.energy_income_max {
            return 0.0;
        }
        income += under_construction(inputs.units, &self.special.fusion) * p.fusion_income;

        let t = inputs.economy.minutes_since_initial_build;
        let increment = (p.energy_increment_exp * t + p.energy_increment_start).min(p.energy_increment_max);
        p.fusion_priority * (increment * t - income) / p.fusion_income
    }

    fn extractor_term(&self, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let spots = inputs.extraction;
        let free = spots.count(Some(SpotOwner::Free));
        if free == 0 {
            return 0.0;
        }
        let total = spots.count(None) as f64;
        let owned_part = spots.count(Some(SpotOwner::SelfOwned)) as f64 / total;
        let free_part = free as f64 / total;

        let mut term = 0.0;
        let mut multiplier = p.metal_extractor_priority;
        if owned_part < p.extraction_point_should_own {
            multiplier *= p.extraction_point_multiplier;
            term += p.metal_extractor_less_own_addition;
        } else if free as f64 >= p.extraction_min_free_number || free_part >= p.extraction_min_free_part {
            multiplier *= (p.extraction_point_multiplier - 1.0) * free_part + 1.0;
        }
        term + multiplier * self.metal_gap(inputs)
    }

    fn maker_term(&self, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let spots = inputs.extraction;
        let free = spots.count(Some(SpotOwner::Free));

        let spots_exhausted = if free == 0 {
            true
        } else {
            let total = spots.count(None) as f64;
            let owned_part = spots.count(Some(SpotOwner::SelfOwned)) as f64 / total;
            let free_part = free as f64 / total;
            owned_part >= p.extraction_point_should_own
                && free as f64 <= p.extraction_min_free_number
                && free_part <= p.extraction_min_free_part
        };

        let gap = if spots_exhausted { self.metal_gap(inputs) } else { 0.0 };
        gap - p.metal_maker_decrement
    }

    /// Target metal income minus the current one, counting each extractor
    /// or maker under construction as one unit of income.
    fn metal_gap(&self, inputs: &PriorityInputs<'_>) -> f64 {
        let s = &self.special;
        let building = under_construction(inputs.units, &s.metal_extractor)
            + under_construction(inputs.units, &s.metal_maker);
        let income = inputs.economy.metal_income + building;
        self.tuning.metal_increment * inputs.economy.minutes_since_initial_build - income
    }
}
