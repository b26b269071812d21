use skirmish_core::{ArmorType, DamageType, UnitDef, UnitGroup};

use super::{PriorityGenerator, PriorityInputs};
use crate::threat::SightedEnemies;

impl PriorityGenerator {
    /// Rebuild the damage and armor axes from the current threat.
    ///
    /// A damage type scores high when the enemy's health is cheap to chew
    /// through with it. An armor type scores high when little enemy DPS is
    /// effective against it.
    pub(super) fn refresh_threat_matrices(&mut self, threat: &SightedEnemies) {
        let p = &self.tuning;
        let matrix = &self.matrix;

        let resistance: Vec<(DamageType, f64)> = DamageType::ALL
            .iter()
            .map(|&damage| {
                let health = ArmorType::ALL
                    .iter()
                    .filter_map(|&armor| {
                        let m = matrix.multiplier(armor, damage);
                        if m == 0.0 {
                            return None;
                        }
                        let hp = threat.armor_health(UnitGroup::AttackForce, armor)
                            + threat.armor_health(UnitGroup::ArmoredBuilding, armor);
                        Some(hp / m)
                    })
                    .sum::<f64>();
                (damage, health)
            })
            .collect();
        let max_health = resistance
            .iter()
            .map(|(_, h)| *h)
            .fold(f64::MIN_POSITIVE, f64::max);
        let span = p.damage_type_prio_max - p.damage_type_prio_min;
        self.damage_axis = resistance
            .into_iter()
            .map(|(damage, h)| (damage, span - span * h / max_health + p.damage_type_prio_min))
            .collect();

        let pressure: Vec<(ArmorType, f64)> = ArmorType::ALL
            .iter()
            .map(|&armor| {
                let dps = DamageType::ALL
                    .iter()
                    .map(|&damage| {
                        let dps = threat.damage_dps(UnitGroup::ArmoredBuilding, damage)
                            + threat.damage_dps(UnitGroup::AttackForce, damage);
                        dps * matrix.multiplier(armor, damage)
                    })
                    .sum::<f64>();
                (armor, 1.0 + dps)
            })
            .collect();
        let max_pressure = pressure
            .iter()
            .map(|(_, pa)| *pa)
            .fold(f64::MIN_POSITIVE, f64::max);
        let span = p.armor_type_prio_max - p.armor_type_prio_min;
        self.armor_axis = pressure
            .into_iter()
            .map(|(armor, pa)| (armor, span - span * pa / max_pressure + p.armor_type_prio_min))
            .collect();

        let per_health = p.armored_building_prio / p.armored_building_health_per;
        self.armored_building = DamageType::ALL
            .iter()
            .map(|&damage| {
                let effective = ArmorType::ALL
                    .iter()
                    .map(|&armor| {
                        threat.armor_health(UnitGroup::AttackForce, armor)
                            * matrix.multiplier(armor, damage)
                    })
                    .sum::<f64>();
                (damage, effective * per_health)
            })
            .collect();
    }

    pub fn damage_axis(&self, damage: DamageType) -> f64 {
        self.damage_axis.get(&damage).copied().unwrap_or(0.0)
    }

    pub fn armor_axis(&self, armor: ArmorType) -> f64 {
        self.armor_axis.get(&armor).copied().unwrap_or(0.0)
    }

    /// Attack force matrix cell.
    pub fn attack_force_priority(&self, armor: ArmorType, damage: DamageType) -> f64 {
        self.damage_axis(damage) * self.armor_axis(armor)
    }

    pub fn armored_building_priority(&self, damage: DamageType) -> f64 {
        self.armored_building.get(&damage).copied().unwrap_or(0.0)
    }

    pub(super) fn attack_force_score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let mut score = 0.0;
        if let Some(damage) = def.damage {
            score += self.attack_force_priority(def.armor, damage)
                - inputs.units.nr_all(&def.name) as f64 * p.attack_force_unit_decrement;
        }
        if def.anti_air {
            score += self.anti_air_gap(inputs) * p.anti_air_multiplier;
        }
        score
    }

    pub(super) fn armored_building_score(&self, def: &UnitDef, inputs: &PriorityInputs<'_>) -> f64 {
        let p = &self.tuning;
        let s = &self.special;
        let mut score = p.armored_building_prio_min;
        if let Some(damage) = def.damage {
            score += self.armored_building_priority(damage) - inputs.units.nr_all(&def.name) as f64;
        }
        if def.anti_air {
            let mut gap = self.anti_air_gap(inputs);
            if def.name == s.special_anti_air {
                gap *= p.special_anti_air_priority;
            }
            score += gap;
        }
        if def.name == s.executioner {
            score += p.executioner_extra_priority;
        }
        score.min(p.armored_building_prio_max)
    }

    /// Anti-air units wanted for the flying health seen, minus those owned.
    fn anti_air_gap(&self, inputs: &PriorityInputs<'_>) -> f64 {
        inputs.threat.flying_health() / self.tuning.anti_air_per_flying_health
            - inputs.units.nr_anti_air() as f64
    }
}
