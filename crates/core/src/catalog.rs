//! Unit definitions: capability groups, armor and damage classes, and which
//! types each producer can build.
//!
//! The catalog is static data loaded once from YAML. Iteration order is the
//! file order, which is also the tie-break order of the ranked priority list.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SkirmishError};

/// Coarse capability group a unit type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitGroup {
    AttackForce,
    ArmoredBuilding,
    Builder,
    Factory,
    MobileBuilder,
    Economic,
    Scout,
    Building,
    Healer,
}

impl UnitGroup {
    pub const ALL: [UnitGroup; 9] = [
        UnitGroup::AttackForce,
        UnitGroup::ArmoredBuilding,
        UnitGroup::Builder,
        UnitGroup::Factory,
        UnitGroup::MobileBuilder,
        UnitGroup::Economic,
        UnitGroup::Scout,
        UnitGroup::Building,
        UnitGroup::Healer,
    ];
}

impl std::fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitGroup::AttackForce => write!(f, "attack_force"),
            UnitGroup::ArmoredBuilding => write!(f, "armored_building"),
            UnitGroup::Builder => write!(f, "builder"),
            UnitGroup::Factory => write!(f, "factory"),
            UnitGroup::MobileBuilder => write!(f, "mobile_builder"),
            UnitGroup::Economic => write!(f, "economic"),
            UnitGroup::Scout => write!(f, "scout"),
            UnitGroup::Building => write!(f, "building"),
            UnitGroup::Healer => write!(f, "healer"),
        }
    }
}

/// Armor class of a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorType {
    Heavy,
    Medium,
    Light,
    Eco,
    Building,
    ArmoredBuilding,
}

impl ArmorType {
    pub const ALL: [ArmorType; 6] = [
        ArmorType::Heavy,
        ArmorType::Medium,
        ArmorType::Light,
        ArmorType::Eco,
        ArmorType::Building,
        ArmorType::ArmoredBuilding,
    ];
}

/// Damage class of a unit type's primary weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Beam weapons.
    #[serde(alias = "beam")]
    Piercing,
    Light,
    Medium,
    Explosive,
}

impl DamageType {
    pub const ALL: [DamageType; 4] = [
        DamageType::Piercing,
        DamageType::Light,
        DamageType::Medium,
        DamageType::Explosive,
    ];
}

/// Static description of one unit type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitDef {
    pub name: String,
    /// Capability groups. The first entry is the primary group.
    #[serde(default)]
    pub groups: Vec<UnitGroup>,
    #[serde(default = "default_armor")]
    pub armor: ArmorType,
    #[serde(default)]
    pub damage: Option<DamageType>,
    /// Whether the priority generator should consider producing this type.
    #[serde(default = "default_true")]
    pub buildable: bool,
    #[serde(default)]
    pub anti_air: bool,
    #[serde(default)]
    pub flying: bool,
    #[serde(default)]
    pub mobile: bool,
    #[serde(default)]
    pub max_health: f64,
    /// Damage per second of the primary weapon.
    #[serde(default)]
    pub dps: f64,
    /// Distance at which the unit reveals hostile units.
    #[serde(default = "default_sight_radius")]
    pub sight_radius: f64,
    /// Unit types this type can construct.
    #[serde(default)]
    pub builds: Vec<String>,
}

fn default_armor() -> ArmorType {
    ArmorType::Building
}

fn default_true() -> bool {
    true
}

fn default_sight_radius() -> f64 {
    400.0
}

impl UnitDef {
    pub fn primary_group(&self) -> Option<UnitGroup> {
        self.groups.first().copied()
    }

    pub fn in_group(&self, group: UnitGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn can_build(&self, target: &str) -> bool {
        self.builds.iter().any(|b| b == target)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    units: Vec<UnitDef>,
}

/// All known unit definitions keyed by name, in file order.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: IndexMap<String, UnitDef>,
}

const BUNDLED_CATALOG: &str = include_str!("../../../data/catalog/units.yml");

impl UnitCatalog {
    /// Build a catalog from definitions, validating cross references.
    pub fn from_defs(defs: Vec<UnitDef>) -> Result<Self> {
        let mut units = IndexMap::with_capacity(defs.len());
        for def in defs {
            if units.contains_key(&def.name) {
                return Err(SkirmishError::Config(format!(
                    "duplicate unit definition '{}'",
                    def.name
                )));
            }
            units.insert(def.name.clone(), def);
        }
        let catalog = Self { units };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_defs(file.units)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading unit catalog");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_yaml_str(BUNDLED_CATALOG)
    }

    fn validate(&self) -> Result<()> {
        for def in self.units.values() {
            for target in &def.builds {
                if !self.units.contains_key(target) {
                    return Err(SkirmishError::Config(format!(
                        "unit '{}' builds unknown type '{}'",
                        def.name, target
                    )));
                }
            }
            if def.in_group(UnitGroup::Builder) && def.builds.is_empty() {
                return Err(SkirmishError::Config(format!(
                    "builder '{}' has an empty build list",
                    def.name
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UnitDef> {
        self.units.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&UnitDef> {
        self.get(name)
            .ok_or_else(|| SkirmishError::UnknownUnitDef(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitDef> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// True if `producer` is a known type whose build list contains `target`.
    pub fn can_build(&self, producer: &str, target: &str) -> bool {
        self.get(producer).is_some_and(|def| def.can_build(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses() {
        let catalog = UnitCatalog::bundled().unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.iter().any(|d| d.in_group(UnitGroup::Builder)));
        assert!(catalog.iter().any(|d| d.in_group(UnitGroup::AttackForce)));
    }

    #[test]
    fn catalog_preserves_file_order() {
        let yaml = r#"
units:
  - name: zeta
    groups: [economic]
  - name: alpha
    groups: [economic]
"#;
        let catalog = UnitCatalog::from_yaml_str(yaml).unwrap();
        let names: Vec<_> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn unknown_build_target_is_rejected() {
        let yaml = r#"
units:
  - name: yard
    groups: [builder, factory]
    builds: [ghost]
"#;
        let err = UnitCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let defs = vec![
            UnitDef {
                name: "a".into(),
                groups: vec![],
                armor: ArmorType::Light,
                damage: None,
                buildable: true,
                anti_air: false,
                flying: false,
                mobile: false,
                max_health: 1.0,
                dps: 0.0,
                sight_radius: 400.0,
                builds: vec![],
            };
            2
        ];
        assert!(UnitCatalog::from_defs(defs).is_err());
    }

    #[test]
    fn beam_is_an_alias_for_piercing() {
        let d: DamageType = serde_yaml::from_str("beam").unwrap();
        assert_eq!(d, DamageType::Piercing);
    }

    #[test]
    fn can_build_checks_producer_list() {
        let catalog = UnitCatalog::bundled().unwrap();
        let producer = catalog
            .iter()
            .find(|d| d.in_group(UnitGroup::Builder))
            .unwrap();
        let target = producer.builds[0].clone();
        assert!(catalog.can_build(&producer.name, &target));
        assert!(!catalog.can_build("no-such-unit", &target));
    }
}
