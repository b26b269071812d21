use thiserror::Error;

use crate::ids::UnitId;

#[derive(Error, Debug)]
pub enum SkirmishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown unit definition: {0}")]
    UnknownUnitDef(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    #[error("Unit {0} has been destroyed")]
    UnitDestroyed(UnitId),

    #[error("{0}")]
    Other(String),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SkirmishError>;
