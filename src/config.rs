//! Simulator configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a valid configuration.

use crate::detection::{DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_QUBITS, DetectionThresholds};
use crate::error::ConfigError;
use crate::model::{BornRuleModel, CircuitModel, MeasurementModel};
use crate::sampler::{MAX_QUBITS, Sampler};
use crate::QuantumChannel;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound on rounds per run.
    pub max_rounds: usize,
    /// Rounds used when the caller does not specify a count.
    pub default_rounds: usize,
    /// Seed of the simulator RNG; OS entropy when absent.
    pub seed: Option<u64>,
    pub backend: BackendConfig,
    pub detection: DetectionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10_000,
            default_rounds: 100,
            seed: None,
            backend: BackendConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

/// Where measurement outcomes come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Density-matrix circuit sampler.
    Circuit {
        #[serde(default = "default_shots")]
        shots: usize,
        #[serde(default)]
        noise: Option<NoiseConfig>,
    },
    /// Analytic Born-rule sampling.
    BornRule {
        #[serde(default)]
        flip_probability: f64,
    },
}

fn default_shots() -> usize {
    1
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Circuit {
            shots: default_shots(),
            noise: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    BitFlip,
    PhaseFlip,
    Depolarizing,
}

/// Single-qubit channel applied before every measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub kind: NoiseKind,
    pub probability: f64,
}

impl NoiseConfig {
    pub fn channel(&self) -> Result<QuantumChannel, ConfigError> {
        let channel = match self.kind {
            NoiseKind::BitFlip => QuantumChannel::bit_flip(self.probability),
            NoiseKind::PhaseFlip => QuantumChannel::phase_flip(self.probability),
            NoiseKind::Depolarizing => QuantumChannel::depolarizing(self.probability),
        }?;
        Ok(channel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub thresholds: DetectionThresholds,
    pub history_capacity: usize,
    pub max_qubits: usize,
    /// Pre-fill the timeline with fabricated demo records.
    pub synthetic_history: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            thresholds: DetectionThresholds::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_qubits: DEFAULT_MAX_QUBITS,
            synthetic_history: false,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".into()));
        }
        if self.default_rounds == 0 || self.default_rounds > self.max_rounds {
            return Err(ConfigError::Invalid(format!(
                "default_rounds must be within 1..={}, got {}",
                self.max_rounds, self.default_rounds
            )));
        }

        match &self.backend {
            BackendConfig::Circuit { shots, noise } => {
                if *shots == 0 {
                    return Err(ConfigError::Invalid("shots must be at least 1".into()));
                }
                if let Some(noise) = noise {
                    noise.channel()?;
                }
            }
            BackendConfig::BornRule { flip_probability } => {
                if !(0.0..=1.0).contains(flip_probability) {
                    return Err(ConfigError::Invalid(format!(
                        "flip_probability must lie in [0, 1], got {flip_probability}"
                    )));
                }
            }
        }

        let detection = &self.detection;
        detection.thresholds.validate()?;
        if detection.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".into(),
            ));
        }
        if detection.max_qubits == 0 || detection.max_qubits > MAX_QUBITS {
            return Err(ConfigError::Invalid(format!(
                "detection max_qubits must be within 1..={MAX_QUBITS}, got {}",
                detection.max_qubits
            )));
        }
        Ok(())
    }

    /// Measurement model for protocol sessions.
    pub fn build_model(&self) -> Result<Box<dyn MeasurementModel>, ConfigError> {
        Ok(match &self.backend {
            BackendConfig::Circuit { shots, .. } => {
                Box::new(CircuitModel::new(self.build_sampler()?).with_shots(*shots))
            }
            BackendConfig::BornRule { flip_probability } => {
                Box::new(BornRuleModel::new().with_flip_probability(*flip_probability))
            }
        })
    }

    /// Circuit executor for detection runs.
    ///
    /// A Born-rule backend's flip probability becomes a bit-flip channel.
    pub fn build_sampler(&self) -> Result<Sampler, ConfigError> {
        let channel = match &self.backend {
            BackendConfig::Circuit { noise, .. } => {
                noise.as_ref().map(NoiseConfig::channel).transpose()?
            }
            BackendConfig::BornRule { flip_probability } if *flip_probability > 0.0 => {
                Some(QuantumChannel::bit_flip(*flip_probability)?)
            }
            BackendConfig::BornRule { .. } => None,
        };
        Ok(match channel {
            Some(channel) => Sampler::new().with_channel(channel),
            None => Sampler::new(),
        })
    }
}
