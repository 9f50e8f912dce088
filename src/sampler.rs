use crate::circuit::{Circuit, CircuitExecutor, Counts, Instruction};
use crate::core::errors::ExecutorError;
use crate::{Gate, Measurement, QuantumChannel, QuantumState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Widest register the density-matrix backend accepts (4^8 complex entries).
pub const MAX_QUBITS: usize = 8;

/// Local circuit executor backed by the density-matrix simulator.
///
/// The `Sampler` runs every circuit of a batch for a number of shots,
/// optionally passing each qubit through a noise channel right before it is
/// measured.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    /// Optional quantum channel applied to a qubit before each measurement.
    pub channel: Option<QuantumChannel>,
}

impl Sampler {
    /// Creates a noise-free `Sampler`.
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Sets the noise channel for the sampler.
    ///
    /// # Arguments
    ///
    /// * `channel` - A single-qubit `QuantumChannel`.
    pub fn with_channel(mut self, channel: QuantumChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Runs one circuit for `num_shots` shots.
    ///
    /// Every shot re-simulates the circuit from |0...0>, so mid-circuit
    /// measurements and resets behave like they would on hardware.
    ///
    /// # Returns
    ///
    /// A `Counts` map from bitstring (classical bit 0 rightmost) to occurrences,
    /// or an `ExecutorError` if the circuit is malformed.
    pub fn run<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        num_shots: usize,
        rng: &mut R,
    ) -> Result<Counts, ExecutorError> {
        if num_shots == 0 {
            return Err(ExecutorError::NoShots);
        }
        if circuit.num_qubits == 0 || circuit.num_qubits > MAX_QUBITS {
            return Err(ExecutorError::UnsupportedWidth {
                requested: circuit.num_qubits,
                max: MAX_QUBITS,
            });
        }

        let mut counts = Counts::new();
        for _ in 0..num_shots {
            let clbits = self.run_shot(circuit, rng)?;
            let key: String = clbits
                .iter()
                .rev()
                .map(|&bit| if bit { '1' } else { '0' })
                .collect();
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn run_shot<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        rng: &mut R,
    ) -> Result<Vec<bool>, ExecutorError> {
        let mut state = QuantumState::new(circuit.num_qubits);
        let mut clbits = vec![false; circuit.num_clbits];
        let z_basis = Measurement::z_basis().map_err(|e| ExecutorError::State(e.into()))?;

        for instruction in &circuit.instructions {
            match *instruction {
                Instruction::X(q) => state.apply(&Gate::x(), &[q])?,
                Instruction::Z(q) => state.apply(&Gate::z(), &[q])?,
                Instruction::H(q) => state.apply(&Gate::h(), &[q])?,
                Instruction::S(q) => state.apply(&Gate::s(), &[q])?,
                Instruction::Sdg(q) => state.apply(&Gate::sdg(), &[q])?,
                Instruction::Ry { qubit, theta } => {
                    let gate = Gate::ry(theta).map_err(|e| ExecutorError::State(e.into()))?;
                    state.apply(&gate, &[qubit])?
                }
                Instruction::Cx { control, target } => {
                    state.apply_controlled(&Gate::x(), &[target], &[control])?
                }
                Instruction::Measure { qubit, clbit } => {
                    let slot = clbits.get_mut(clbit).ok_or(ExecutorError::ClbitOutOfRange {
                        clbit,
                        num_clbits: circuit.num_clbits,
                    })?;
                    if let Some(chan) = &self.channel {
                        state.apply_channel(chan, &[qubit])?;
                    }
                    *slot = state.measure(&z_basis, &[qubit], rng)?.index == 1;
                }
                Instruction::Reset(q) => state.reset(q, rng)?,
            }
        }

        Ok(clbits)
    }
}

impl CircuitExecutor for Sampler {
    /// Circuits run in parallel; circuit `i` draws from stream `i` of a
    /// ChaCha generator keyed by `seed`, so the batch is reproducible.
    fn execute(
        &self,
        circuits: &[Circuit],
        shots: usize,
        seed: u64,
    ) -> Vec<Result<Counts, ExecutorError>> {
        debug!(circuits = circuits.len(), shots, "executing circuit batch");

        circuits
            .par_iter()
            .enumerate()
            .map(|(i, circuit)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(i as u64);
                self.run(circuit, shots, &mut rng)
            })
            .collect()
    }
}
