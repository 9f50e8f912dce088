use crate::core::channels::QuantumChannel;
use crate::core::errors::{ChannelError, MeasurementError, StateError};
use crate::core::gates::Gate;
use crate::core::measurements::{Measurement, MeasurementResult};
use crate::core::utils::{self, dagger, find_duplicate, trace};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// Mixed state of an `n`-qubit register stored as a `2^n x 2^n` density matrix.
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub density_matrix: Array2<Complex64>,
    pub num_qubits: usize,
}

impl QuantumState {
    /// Creates a new quantum state initialized to |0...0>.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut density_matrix = Array2::<Complex64>::zeros((dim, dim));
        density_matrix[[0, 0]] = Complex64::new(1.0, 0.0);

        Self {
            density_matrix,
            num_qubits,
        }
    }

    /// rho -> U rho U†, `u` already spans the whole register
    fn apply_operator(&mut self, u: &Array2<Complex64>) -> Result<(), StateError> {
        let (rows, cols) = u.dim();
        let dim = 1 << self.num_qubits;

        if rows != dim || cols != dim {
            return Err(StateError::DimensionMismatch {
                expected: dim,
                got_rows: rows,
                got_cols: cols,
            });
        }

        self.density_matrix = u.dot(&self.density_matrix).dot(&dagger(u));
        Ok(())
    }

    fn validate_qubit_index(&self, index: usize) -> Result<(), StateError> {
        if index >= self.num_qubits {
            return Err(StateError::IndexOutOfBounds {
                index,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Applies a non-controlled gate.
    pub fn apply(&mut self, gate: &Gate, target_qubits: &[usize]) -> Result<(), StateError> {
        self.apply_controlled(gate, target_qubits, &[])
    }

    /// Applies `gate` to `target_qubits`, conditioned on every qubit in `control_qubits`.
    pub fn apply_controlled(
        &mut self,
        gate: &Gate,
        target_qubits: &[usize],
        control_qubits: &[usize],
    ) -> Result<(), StateError> {
        if gate.num_qubits != target_qubits.len() {
            return Err(StateError::DimensionMismatch {
                expected: gate.num_qubits,
                got_rows: target_qubits.len(),
                got_cols: 0,
            });
        }

        for &q in target_qubits.iter().chain(control_qubits) {
            self.validate_qubit_index(q)?;
        }

        let full = Gate::expand_gate(self.num_qubits, gate, target_qubits, control_qubits)?;
        self.apply_operator(&full.matrix)
    }

    /// Born-rule probability of every outcome of `measurement` on `target_qubits`,
    /// together with the expanded operators.
    pub fn outcome_probabilities(
        &self,
        measurement: &Measurement,
        target_qubits: &[usize],
    ) -> Result<(Vec<f64>, Vec<Array2<Complex64>>), StateError> {
        for &q in target_qubits {
            self.validate_qubit_index(q)?;
        }

        if let Some(dup) = find_duplicate(target_qubits) {
            return Err(StateError::MeasurementError(
                MeasurementError::DuplicateQubit(dup),
            ));
        }

        let expanded_ops = measurement.get_expanded_operators(self.num_qubits, target_qubits)?;

        let mut probs: Vec<f64> = expanded_ops
            .iter()
            .map(|op| {
                let branch = op.dot(&self.density_matrix).dot(&dagger(op));
                trace(&branch).re.max(0.0)
            })
            .collect();

        // Renormalise against floating point drift
        let total: f64 = probs.iter().sum();
        if total > 0.0 {
            probs.iter_mut().for_each(|p| *p /= total);
        }

        Ok((probs, expanded_ops))
    }

    /// Picks an outcome index weighted by `probs`.
    fn pick_outcome<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
        let roll: f64 = rng.random();

        let mut cumulative = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                return i;
            }
        }
        probs.len().saturating_sub(1)
    }

    /// Projective measurement; the state collapses onto the observed branch.
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        measurement: &Measurement,
        target_qubits: &[usize],
        rng: &mut R,
    ) -> Result<MeasurementResult, StateError> {
        let (probs, ops) = self.outcome_probabilities(measurement, target_qubits)?;

        let outcome_idx = Self::pick_outcome(&probs, rng);
        let p_selected = probs[outcome_idx];

        if p_selected <= 1e-12 {
            return Err(StateError::VanishingOutcome(Complex64::new(p_selected, 0.0)));
        }

        // rho' = (M_k rho M_k†) / p_k
        let m_k = &ops[outcome_idx];
        let numerator = m_k.dot(&self.density_matrix).dot(&dagger(m_k));
        self.density_matrix = numerator.mapv(|val| val / p_selected);

        Ok(MeasurementResult {
            index: outcome_idx,
            value: measurement.values[outcome_idx],
        })
    }

    /// Measures `qubit` in Z and flips it back to |0> when it read 1.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> Result<(), StateError> {
        let res = self.measure(&Measurement::z_basis()?, &[qubit], rng)?;
        if res.index == 1 {
            self.apply(&Gate::x(), &[qubit])?;
        }
        Ok(())
    }

    /// rho -> sum_k K_k rho K_k†
    pub fn apply_channel(
        &mut self,
        channel: &QuantumChannel,
        target_qubits: &[usize],
    ) -> Result<(), StateError> {
        if let Some(dup) = find_duplicate(target_qubits) {
            return Err(StateError::ChannelError(ChannelError::DuplicateQubit(dup)));
        }
        for &q in target_qubits {
            self.validate_qubit_index(q)?;
        }

        let ops = channel.get_expanded_operators(self.num_qubits, target_qubits)?;

        let dim = self.density_matrix.nrows();
        self.density_matrix = ops
            .iter()
            .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, k| {
                acc + k.dot(&self.density_matrix).dot(&dagger(k))
            });

        Ok(())
    }

    /// Trace of the density matrix; stays 1 under every operation above.
    pub fn trace(&self) -> Complex64 {
        utils::trace(&self.density_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn hadamard_gives_even_split() {
        let mut state = QuantumState::new(1);
        state.apply(&Gate::h(), &[0]).unwrap();
        let (probs, _) = state
            .outcome_probabilities(&Measurement::z_basis().unwrap(), &[0])
            .unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!((probs[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn measurement_collapses_state() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut state = QuantumState::new(1);
        state.apply(&Gate::h(), &[0]).unwrap();

        let first = state.measure(&Measurement::z_basis().unwrap(), &[0], &mut rng).unwrap();
        for _ in 0..10 {
            let again = state.measure(&Measurement::z_basis().unwrap(), &[0], &mut rng).unwrap();
            assert_eq!(first.index, again.index);
        }
        assert!((state.trace().re - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_returns_to_ground() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = QuantumState::new(1);
        state.apply(&Gate::x(), &[0]).unwrap();
        state.reset(0, &mut rng).unwrap();
        let (probs, _) = state
            .outcome_probabilities(&Measurement::z_basis().unwrap(), &[0])
            .unwrap();
        assert!((probs[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn full_bit_flip_channel_inverts_populations() {
        let mut state = QuantumState::new(2);
        state
            .apply_channel(&QuantumChannel::bit_flip(1.0).unwrap(), &[1])
            .unwrap();
        let (probs, _) = state
            .outcome_probabilities(&Measurement::z_basis().unwrap(), &[1])
            .unwrap();
        assert!((probs[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_qubit_is_reported() {
        let mut state = QuantumState::new(1);
        let err = state.apply(&Gate::x(), &[3]).unwrap_err();
        assert!(matches!(
            err,
            StateError::IndexOutOfBounds {
                index: 3,
                num_qubits: 1
            }
        ));
    }
}
