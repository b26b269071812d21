use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitCatalog;
use crate::error::Result;
use crate::tuning::Tuning;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

// ── Engine config ─────────────────────────────────────────────

/// Process-level settings: where tuning and catalog data live and how
/// verbose logging is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// YAML tuning overrides. Defaults apply when unset.
    pub tuning_path: Option<PathBuf>,
    /// YAML unit catalog. The bundled catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SKIRMISH_PROFILE`. When set (e.g. `LADDER`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SKIRMISH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            tuning_path: profiled_env_opt(p, "SKIRMISH_TUNING").map(PathBuf::from),
            catalog_path: profiled_env_opt(p, "SKIRMISH_CATALOG").map(PathBuf::from),
            log_filter: profiled_env_or(p, "SKIRMISH_LOG", "info"),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Load tuning from `tuning_path`, or the defaults.
    pub fn load_tuning(&self) -> Result<Tuning> {
        match &self.tuning_path {
            Some(path) => Tuning::from_file(path),
            None => Ok(Tuning::default()),
        }
    }

    /// Load the unit catalog from `catalog_path`, or the bundled one.
    pub fn load_catalog(&self) -> Result<UnitCatalog> {
        match &self.catalog_path {
            Some(path) => UnitCatalog::from_file(path),
            None => UnitCatalog::bundled(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  tuning:   {}",
            self.tuning_path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(defaults)".into())
        );
        tracing::info!(
            "  catalog:  {}",
            self.catalog_path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(bundled)".into())
        );
        tracing::info!("  log:      {}", self.log_filter);
    }
}
