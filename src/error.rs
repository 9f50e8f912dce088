use crate::core::errors::{ChannelError, ExecutorError};
use std::path::PathBuf;
use thiserror::Error;

/// A round whose measurement could not be obtained from the backend.
///
/// Never escapes a session: the measurement model replaces it with the
/// fallback outcome.
#[derive(Error, Debug, Clone)]
pub enum MeasurementUnavailable {
    #[error("backend failure: {0}")]
    Backend(#[from] ExecutorError),

    #[error("ambiguous result: expected a {expected_width}-bit outcome, got {observed:?}")]
    Ambiguous {
        expected_width: usize,
        observed: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid noise channel: {0}")]
    Channel(#[from] ChannelError),
}

/// Errors surfaced to callers of the simulator facade.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("round count must be within 1..={max}, got {requested}")]
    InvalidRounds { requested: i64, max: usize },

    #[error("qubit count must be within 1..={max}, got {requested}")]
    InvalidQubits { requested: usize, max: usize },

    #[error("unknown eavesdropping strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimulationError {
    /// True for malformed caller input, rejected before any simulation work.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SimulationError::InvalidRounds { .. }
                | SimulationError::InvalidQubits { .. }
                | SimulationError::UnknownStrategy(_)
                | SimulationError::UnknownProtocol(_)
        )
    }
}
