use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use skirmish_core::{Position, ResourceLevel, UnitCatalog};

/// Scenario played by the simulator, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulated game seconds.
    #[serde(default = "default_seconds")]
    pub seconds: f64,

    /// Length of one frame in seconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,

    /// Game seconds between progress log lines.
    #[serde(default = "default_report_every")]
    pub report_every_seconds: f64,

    /// Seconds a construction needs in the sandbox.
    #[serde(default = "default_build_seconds")]
    pub build_seconds: f64,

    /// Sandbox unit speed in distance per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,

    #[serde(default = "default_metal")]
    pub metal: ResourceConfig,

    #[serde(default = "default_energy")]
    pub energy: ResourceConfig,

    /// Metal spots as `[x, z]` pairs.
    #[serde(default)]
    pub spots: Vec<[f64; 2]>,

    /// Owned units present at game start.
    #[serde(default)]
    pub units: Vec<Placement>,

    /// Enemy units and when they are first seen.
    #[serde(default)]
    pub enemies: Vec<Placement>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub storage: f64,
}

impl From<ResourceConfig> for ResourceLevel {
    fn from(r: ResourceConfig) -> Self {
        ResourceLevel {
            current: r.current,
            income: r.income,
            storage: r.storage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub def: String,
    pub x: f64,
    pub z: f64,
    /// Game second at which the unit shows up.
    #[serde(default)]
    pub at: f64,
}

impl Placement {
    pub fn position(&self) -> Position {
        Position::flat(self.x, self.z)
    }
}

fn default_seconds() -> f64 {
    900.0
}

fn default_tick_seconds() -> f64 {
    1.0 / 30.0
}

fn default_report_every() -> f64 {
    60.0
}

fn default_build_seconds() -> f64 {
    5.0
}

fn default_move_speed() -> f64 {
    100.0
}

fn default_metal() -> ResourceConfig {
    ResourceConfig {
        current: 1000.0,
        income: 2.0,
        storage: 1000.0,
    }
}

fn default_energy() -> ResourceConfig {
    ResourceConfig {
        current: 1000.0,
        income: 20.0,
        storage: 1000.0,
    }
}

impl Default for SimConfig {
    /// Commander start in a corner with a ring of spots and an enemy base
    /// across the map that gets scouted after two minutes.
    fn default() -> Self {
        let spots = (0..8)
            .map(|i| {
                let x = 400.0 + 350.0 * (i % 4) as f64;
                let z = 300.0 + 500.0 * (i / 4) as f64;
                [x, z]
            })
            .chain([[6000.0, 6000.0], [6300.0, 5800.0]])
            .collect();
        Self {
            seconds: default_seconds(),
            tick_seconds: default_tick_seconds(),
            report_every_seconds: default_report_every(),
            build_seconds: default_build_seconds(),
            move_speed: default_move_speed(),
            metal: default_metal(),
            energy: default_energy(),
            spots,
            units: vec![Placement {
                def: "commander".to_string(),
                x: 200.0,
                z: 200.0,
                at: 0.0,
            }],
            enemies: vec![
                Placement {
                    def: "metal_extractor".to_string(),
                    x: 6000.0,
                    z: 6000.0,
                    at: 120.0,
                },
                Placement {
                    def: "medium_tank".to_string(),
                    x: 5800.0,
                    z: 5900.0,
                    at: 120.0,
                },
                Placement {
                    def: "gunship".to_string(),
                    x: 5500.0,
                    z: 5500.0,
                    at: 300.0,
                },
            ],
        }
    }
}

impl SimConfig {
    /// Load a scenario from `path`, or the built-in one when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("using built-in scenario");
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse scenario file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded scenario");
        Ok(config)
    }

    /// Reject scenarios the sandbox cannot play.
    pub fn validate(&self, catalog: &UnitCatalog) -> Result<()> {
        if self.tick_seconds <= 0.0 {
            bail!("tick_seconds must be positive, got {}", self.tick_seconds);
        }
        if self.seconds < 0.0 {
            bail!("seconds must not be negative, got {}", self.seconds);
        }
        for placement in self.units.iter().chain(&self.enemies) {
            if catalog.get(&placement.def).is_none() {
                bail!("unknown unit type in scenario: {}", placement.def);
            }
        }
        Ok(())
    }

    pub fn spot_positions(&self) -> Vec<Position> {
        self.spots.iter().map(|[x, z]| Position::flat(*x, *z)).collect()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize scenario")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            seconds = 120.0
            spots = [[100.0, 0.0]]

            [[units]]
            def = "engineer"
            x = 0.0
            z = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.seconds, 120.0);
        assert_eq!(config.build_seconds, 5.0);
        assert_eq!(config.metal.income, 2.0);
        assert_eq!(config.spot_positions(), vec![Position::flat(100.0, 0.0)]);
        assert_eq!(config.units[0].at, 0.0);
        assert!(config.enemies.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seconds = 30.0\ntick_seconds = 0.5").unwrap();
        let config = SimConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.seconds, 30.0);
        assert_eq!(config.tick_seconds, 0.5);
    }

    #[test]
    fn load_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seconds = \"soon\"").unwrap();
        let err = SimConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse scenario file"));
    }

    #[test]
    fn built_in_scenario_survives_toml() {
        let text = SimConfig::default().to_toml().unwrap();
        let back: SimConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.spots.len(), 10);
        assert_eq!(back.enemies.len(), 3);
    }

    #[test]
    fn unknown_unit_type_fails_validation() {
        let catalog = UnitCatalog::bundled().unwrap();
        assert!(SimConfig::default().validate(&catalog).is_ok());

        let mut config = SimConfig::default();
        config.enemies[0].def = "battleship".to_string();
        let err = config.validate(&catalog).unwrap_err();
        assert!(err.to_string().contains("battleship"));

        config = SimConfig::default();
        config.tick_seconds = 0.0;
        assert!(config.validate(&catalog).is_err());
    }
}
