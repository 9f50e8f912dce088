use crate::core::errors::ChannelError;
use crate::core::utils;
use ndarray::{Array2, array};
use num_complex::Complex64;

/// A CPTP map given by its Kraus operators.
#[derive(Clone, Debug)]
pub struct QuantumChannel {
    pub kraus_ops: Vec<Array2<Complex64>>,
    pub num_qubits: usize,
}

impl QuantumChannel {
    pub fn new(kraus_ops: Vec<Array2<Complex64>>) -> Result<Self, ChannelError> {
        let (rows, cols) = kraus_ops
            .first()
            .map(|op| op.dim())
            .ok_or(ChannelError::Empty)?;

        if rows != cols || !rows.is_power_of_two() {
            return Err(ChannelError::InvalidDimensions);
        }

        // log_2
        let num_qubits = rows.trailing_zeros() as usize;

        if kraus_ops.iter().any(|op| op.dim() != (rows, cols)) {
            return Err(ChannelError::OperatorSizeMismatch);
        }

        if !utils::check_completeness(&kraus_ops, rows) {
            return Err(ChannelError::NotComplete);
        }

        Ok(Self {
            kraus_ops,
            num_qubits,
        })
    }

    /// Lifts the Kraus operators onto `targets` of a larger register.
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, ChannelError> {
        if targets.len() != self.num_qubits {
            return Err(ChannelError::InvalidDimensions);
        }

        Ok(self
            .kraus_ops
            .iter()
            .map(|op| utils::expand_operator(num_total_qubits, op, targets, &[]))
            .collect())
    }

    /// Applies X with probability `p`.
    pub fn bit_flip(p: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(p)?;
        Self::pauli_mixture([1.0 - p, p, 0.0, 0.0])
    }

    /// Applies Z with probability `p`.
    pub fn phase_flip(p: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(p)?;
        Self::pauli_mixture([1.0 - p, 0.0, 0.0, p])
    }

    /// Replaces the state with the maximally mixed one with probability `p`.
    pub fn depolarizing(p: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(p)?;
        let q = p / 4.0;
        Self::pauli_mixture([1.0 - 3.0 * q, q, q, q])
    }

    /// Single-qubit channel applying I, X, Y, Z with the given weights.
    fn pauli_mixture(weights: [f64; 4]) -> Result<QuantumChannel, ChannelError> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        let paulis = [
            array![[one, zero], [zero, one]],
            array![[zero, one], [one, zero]],
            array![[zero, -i], [i, zero]],
            array![[one, zero], [zero, -one]],
        ];

        let kraus_ops = weights
            .iter()
            .zip(paulis)
            .filter(|&(&w, _)| w > 0.0)
            .map(|(&w, pauli)| pauli.mapv(|z| z * w.sqrt()))
            .collect();
        QuantumChannel::new(kraus_ops)
    }
}

fn validate_prob(p: f64) -> Result<(), ChannelError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ChannelError::InvalidProbability(p));
    }
    Ok(())
}
