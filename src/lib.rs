//! Quantum key distribution simulator.
//!
//! Runs BB84, E91, E92 and Six-State sessions against a pluggable
//! measurement model, derives sifted keys with their entropy and error rate,
//! and labels detection runs with a threshold-based anomaly classifier.
//!
//! ```no_run
//! use qkd_sim::{QkdSimulator, SimulationConfig};
//!
//! let config = SimulationConfig { seed: Some(42), ..Default::default() };
//! let simulator = QkdSimulator::new(config)?;
//! let result = simulator.run_simulation(100)?;
//! println!("BB84 QBER = {}", result.qber);
//! # Ok::<(), qkd_sim::SimulationError>(())
//! ```

pub mod circuit;
pub mod config;
mod core;
pub mod detection;
pub mod error;
pub mod model;
pub mod protocols;
pub mod sampler;
pub mod simulation;
pub mod statistics;

pub use crate::config::SimulationConfig;
pub use crate::core::{
    Gate, Measurement, MeasurementResult, QuantumChannel, QuantumState, errors, utils,
};
pub use crate::error::{ConfigError, MeasurementUnavailable, SimulationError};
pub use crate::sampler::Sampler;
pub use crate::simulation::{QkdSimulator, SimulationResult};
