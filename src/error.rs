//! Error types for configuration, actions, profiles, and the environment.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.soc_min"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Malformed action passed to `step`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("action must have 1 or 2 elements, got {0}")]
    WrongArity(usize),
    #[error("action element {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },
}

/// Failure while loading, validating, or splitting profile data.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot read profile \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid profile CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("profile missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("profile series \"{0}\" is empty")]
    EmptySeries(&'static str),
    #[error("profile column \"{column}\" row {row}: {message}")]
    InvalidValue {
        column: String,
        row: usize,
        message: String,
    },
    #[error("invalid split: {0}")]
    Split(String),
}

/// Errors surfaced by `Environment::reset` and `Environment::step`.
///
/// All variants are recoverable: fix the input or call `reset`.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid action: {0}")]
    Action(#[from] ActionError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("episode is terminal at t={t}; call reset before stepping")]
    Terminal { t: usize },
    #[error("environment has not been reset")]
    NotReset,
    #[error("initial soc {soc} outside [{soc_min}, {soc_max}]")]
    InitialSoc { soc: f64, soc_min: f64, soc_max: f64 },
    #[error("profile has {len} entries, horizon needs {horizon}")]
    ProfileTooShort { len: usize, horizon: usize },
}

/// Errors from multi-episode policy evaluation.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("episodes must be greater than 0")]
    NoEpisodes,
    #[error(transparent)]
    Env(#[from] EnvError),
}
