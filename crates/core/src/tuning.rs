//! Balancing constants for scheduling, threat tracking and build priorities.
//!
//! Everything here is immutable once loaded and is passed by reference into
//! the components that need it, so independent engine instances never share
//! tuning state. Every field has a default; a YAML file only needs the values
//! it overrides.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ArmorType, DamageType};
use crate::error::{Result, SkirmishError};

// ── Top level ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Tuning {
    #[serde(default)]
    pub scheduler: SchedulerTuning,
    #[serde(default)]
    pub priority: PriorityTuning,
    #[serde(default)]
    pub threat: ThreatTuning,
    #[serde(default)]
    pub commander: CommanderTuning,
    #[serde(default)]
    pub special_defs: SpecialDefs,
    #[serde(default)]
    pub matrix: ArmorDamageMatrix,
}

impl Tuning {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let tuning: Self = serde_yaml::from_str(yaml)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading tuning");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reject values that would make the scoring formulas divide by zero or
    /// invert a clamp.
    pub fn validate(&self) -> Result<()> {
        let p = &self.priority;
        check_range("economy", p.economy_min, p.economy_max)?;
        check_range("damage_type_prio", p.damage_type_prio_min, p.damage_type_prio_max)?;
        check_range("armor_type_prio", p.armor_type_prio_min, p.armor_type_prio_max)?;
        check_range(
            "armored_building_prio",
            p.armored_building_prio_min,
            p.armored_building_prio_max,
        )?;
        check_positive("priority.fusion_income", p.fusion_income)?;
        check_positive("priority.energy_per_storage", p.energy_per_storage)?;
        check_positive("priority.anti_air_per_flying_health", p.anti_air_per_flying_health)?;
        check_positive("priority.armored_building_health_per", p.armored_building_health_per)?;
        check_positive("priority.factory_minutes_per", p.factory_minutes_per)?;
        check_positive("priority.builder_minutes_per_flying", p.builder_minutes_per_flying)?;
        check_positive("scheduler.task_split_load_time", self.scheduler.task_split_load_time)?;
        check_positive("commander.scout_home_radius", self.commander.scout_home_radius)?;
        for (armor, row) in &self.matrix.multipliers {
            for (damage, value) in row {
                if *value < 0.0 || !value.is_finite() {
                    return Err(SkirmishError::Config(format!(
                        "matrix multiplier {armor:?}/{damage:?} must be a non-negative number, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<()> {
    if min > max {
        return Err(SkirmishError::Config(format!(
            "{name}: min ({min}) is greater than max ({max})"
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value <= 0.0 {
        return Err(SkirmishError::Config(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchedulerTuning {
    /// Seconds of game time one full pass over the active tasks may take.
    #[serde(default = "default_task_split_load_time")]
    pub task_split_load_time: f64,
}

fn default_task_split_load_time() -> f64 { 0.1 }

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            task_split_load_time: default_task_split_load_time(),
        }
    }
}

// ── Threat ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThreatTuning {
    /// Seconds after which an enemy that has not been seen is forgotten.
    #[serde(default = "default_last_seen_timelimit")]
    pub last_seen_timelimit: f64,
}

fn default_last_seen_timelimit() -> f64 { 30.0 }

impl Default for ThreatTuning {
    fn default() -> Self {
        Self {
            last_seen_timelimit: default_last_seen_timelimit(),
        }
    }
}

// ── Priorities ────────────────────────────────────────────────

/// Constants of the build priority formulas. Times are in minutes unless the
/// field name says seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PriorityTuning {
    pub evaluation_interval_seconds: f64,
    pub must_have: f64,
    pub force_build: f64,

    pub economy_min: f64,
    pub economy_max: f64,
    pub economics_only_minutes: f64,
    pub energy_increment_start: f64,
    pub energy_increment_exp: f64,
    pub energy_increment_max: f64,
    pub energy_income_max: f64,
    pub metal_increment: f64,
    pub fusion_priority: f64,
    pub fusion_income: f64,
    pub extraction_point_should_own: f64,
    pub extraction_point_multiplier: f64,
    pub extraction_min_free_part: f64,
    pub extraction_min_free_number: f64,
    pub metal_extractor_priority: f64,
    pub metal_extractor_less_own_addition: f64,
    pub metal_maker_decrement: f64,
    pub energy_per_storage: f64,
    pub storage_priority: f64,

    pub damage_type_prio_min: f64,
    pub damage_type_prio_max: f64,
    pub armor_type_prio_min: f64,
    pub armor_type_prio_max: f64,
    pub attack_force_unit_decrement: f64,
    pub anti_air_per_flying_health: f64,
    pub anti_air_multiplier: f64,

    pub armored_building_prio_min: f64,
    pub armored_building_prio_max: f64,
    pub armored_building_health_per: f64,
    pub armored_building_prio: f64,
    pub executioner_extra_priority: f64,
    pub special_anti_air_priority: f64,

    pub builder_new_min_metal: f64,
    pub builder_priority_min: f64,
    pub builder_wait_seconds: f64,
    pub builder_minutes_per_flying: f64,
    pub builder_flying_priority: f64,
    pub factory_minutes_per: f64,
    pub factory_priority: f64,
    pub scouts_min: usize,
}

impl Default for PriorityTuning {
    fn default() -> Self {
        Self {
            evaluation_interval_seconds: 0.5,
            must_have: 50.0,
            force_build: 10_000.0,

            economy_min: 150.0,
            economy_max: 800.0,
            economics_only_minutes: 0.75,
            energy_increment_start: 2.0,
            energy_increment_exp: 0.75,
            energy_increment_max: 15.0,
            energy_income_max: 300.0,
            metal_increment: 1.5,
            fusion_priority: 10.0,
            fusion_income: 10.0,
            extraction_point_should_own: 0.4,
            extraction_point_multiplier: 4.0,
            extraction_min_free_part: 0.1,
            extraction_min_free_number: 5.0,
            metal_extractor_priority: 10.0,
            metal_extractor_less_own_addition: 100.0,
            metal_maker_decrement: 40.0,
            energy_per_storage: 30.0,
            storage_priority: 5.0,

            damage_type_prio_min: 15.0,
            damage_type_prio_max: 25.0,
            armor_type_prio_min: 10.0,
            armor_type_prio_max: 20.0,
            attack_force_unit_decrement: 4.0,
            anti_air_per_flying_health: 50.0,
            anti_air_multiplier: 10.0,

            armored_building_prio_min: 100.0,
            armored_building_prio_max: 400.0,
            armored_building_health_per: 2000.0,
            armored_building_prio: 50.0,
            executioner_extra_priority: 10.0,
            special_anti_air_priority: 2.0,

            builder_new_min_metal: 50.0,
            builder_priority_min: 100.0,
            builder_wait_seconds: 10.0,
            builder_minutes_per_flying: 3.0,
            builder_flying_priority: 200.0,
            factory_minutes_per: 5.0,
            factory_priority: 300.0,
            scouts_min: 1,
        }
    }
}

// ── Commander ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CommanderTuning {
    /// Types built in order by the first mobile builder before anything else.
    pub initial_build: Vec<String>,
    pub attack_update_seconds: f64,
    pub merge_update_seconds: f64,
    pub attack_force_ground_min: usize,
    pub attack_force_air_min: usize,
    pub attack_force_ground_anti_air_min: usize,
    pub attack_force_air_anti_air_min: usize,
    pub merge_close_radius: f64,
    pub close_to_waypoint: f64,
    pub regroup_radius_per_unit: f64,
    pub move_timeout_seconds: f64,
    /// Game seconds between attempts to send out a free scout.
    pub scout_update_seconds: f64,
    /// Distance from its starting point at which a returning scout is home.
    pub scout_home_radius: f64,
}

impl Default for CommanderTuning {
    fn default() -> Self {
        Self {
            initial_build: vec![
                "metal_extractor".to_string(),
                "metal_extractor".to_string(),
                "fusion_reactor".to_string(),
                "vehicle_plant".to_string(),
            ],
            attack_update_seconds: 0.2,
            merge_update_seconds: 1.0,
            attack_force_ground_min: 10,
            attack_force_air_min: 3,
            attack_force_ground_anti_air_min: 3,
            attack_force_air_anti_air_min: 3,
            merge_close_radius: 2000.0,
            close_to_waypoint: 200.0,
            regroup_radius_per_unit: 100.0,
            move_timeout_seconds: 120.0,
            scout_update_seconds: 5.0,
            scout_home_radius: 300.0,
        }
    }
}

// ── Special unit types ────────────────────────────────────────

/// Unit types that have dedicated scoring rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SpecialDefs {
    pub fusion: String,
    pub metal_extractor: String,
    pub metal_maker: String,
    pub storage: String,
    pub flying_builder: String,
    pub executioner: String,
    pub special_anti_air: String,
}

impl Default for SpecialDefs {
    fn default() -> Self {
        Self {
            fusion: "fusion_reactor".to_string(),
            metal_extractor: "metal_extractor".to_string(),
            metal_maker: "metal_maker".to_string(),
            storage: "storage".to_string(),
            flying_builder: "air_engineer".to_string(),
            executioner: "artillery_emplacement".to_string(),
            special_anti_air: "aa_turret".to_string(),
        }
    }
}

// ── Armor / damage matrix ─────────────────────────────────────

/// Damage multiplier of each damage type against each armor type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ArmorDamageMatrix {
    multipliers: IndexMap<ArmorType, IndexMap<DamageType, f64>>,
}

impl ArmorDamageMatrix {
    pub fn new(multipliers: IndexMap<ArmorType, IndexMap<DamageType, f64>>) -> Self {
        Self { multipliers }
    }

    /// Multiplier for the pair, 0 when the pair is not listed.
    pub fn multiplier(&self, armor: ArmorType, damage: DamageType) -> f64 {
        self.multipliers
            .get(&armor)
            .and_then(|row| row.get(&damage))
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for ArmorDamageMatrix {
    fn default() -> Self {
        use ArmorType as A;
        use DamageType as D;

        let rows: [(ArmorType, [f64; 4]); 6] = [
            (A::Heavy, [1.0, 0.5, 0.75, 0.5]),
            (A::Medium, [1.0, 0.5, 1.0, 0.75]),
            (A::Light, [1.0, 2.0, 1.0, 1.0]),
            (A::Eco, [2.0, 0.1, 0.5, 2.0]),
            (A::Building, [1.5, 0.1, 0.5, 2.0]),
            (A::ArmoredBuilding, [1.5, 0.1, 0.5, 0.75]),
        ];
        let damages = [D::Piercing, D::Light, D::Medium, D::Explosive];

        let multipliers = rows
            .into_iter()
            .map(|(armor, values)| {
                let row = damages.iter().copied().zip(values).collect();
                (armor, row)
            })
            .collect();
        Self { multipliers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn default_matrix_values() {
        let m = ArmorDamageMatrix::default();
        assert_eq!(m.multiplier(ArmorType::Heavy, DamageType::Piercing), 1.0);
        assert_eq!(m.multiplier(ArmorType::Heavy, DamageType::Light), 0.5);
        assert_eq!(m.multiplier(ArmorType::Light, DamageType::Light), 2.0);
        assert_eq!(m.multiplier(ArmorType::ArmoredBuilding, DamageType::Explosive), 0.75);
    }

    #[test]
    fn missing_matrix_pair_is_zero() {
        let m = ArmorDamageMatrix::new(IndexMap::new());
        assert_eq!(m.multiplier(ArmorType::Heavy, DamageType::Piercing), 0.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
priority:
  economy_max: 500
threat:
  last_seen_timelimit: 12
"#;
        let tuning = Tuning::from_yaml_str(yaml).unwrap();
        assert_eq!(tuning.priority.economy_max, 500.0);
        assert_eq!(tuning.priority.economy_min, 150.0);
        assert_eq!(tuning.threat.last_seen_timelimit, 12.0);
        assert_eq!(tuning.scheduler.task_split_load_time, 0.1);
        assert_eq!(tuning.matrix, ArmorDamageMatrix::default());
    }

    #[test]
    fn matrix_override_from_yaml() {
        let yaml = r#"
matrix:
  heavy:
    piercing: 3.0
"#;
        let tuning = Tuning::from_yaml_str(yaml).unwrap();
        assert_eq!(tuning.matrix.multiplier(ArmorType::Heavy, DamageType::Piercing), 3.0);
        assert_eq!(tuning.matrix.multiplier(ArmorType::Light, DamageType::Light), 0.0);
    }

    #[test]
    fn inverted_clamp_is_rejected() {
        let yaml = r#"
priority:
  economy_min: 900
"#;
        let err = Tuning::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("economy"), "got: {err}");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "priority:\n  not_a_field: 1\n";
        assert!(Tuning::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn zero_split_time_is_rejected() {
        let mut tuning = Tuning::default();
        tuning.scheduler.task_split_load_time = 0.0;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.yml");
        std::fs::write(&path, "commander:\n  merge_close_radius: 750\n").unwrap();
        let tuning = Tuning::from_file(&path).unwrap();
        assert_eq!(tuning.commander.merge_close_radius, 750.0);
    }
}
