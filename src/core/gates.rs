use crate::core::errors::GateError;
use crate::core::utils;
use ndarray::{Array2, arr2};
use num_complex::Complex64;

/// Represents a quantum gate.
///
/// A gate is defined by its unitary matrix and the number of qubits it acts on.
#[derive(Clone, Debug)]
pub struct Gate {
    /// The unitary matrix of the gate.
    pub matrix: Array2<Complex64>,
    /// The number of qubits the gate acts on.
    pub num_qubits: usize,
}

impl Gate {
    /// Creates a new `Gate` from a unitary matrix.
    ///
    /// # Errors
    ///
    /// Returns a `GateError` if:
    /// - The matrix is not square.
    /// - The matrix dimensions are not a power of 2.
    /// - The matrix is not unitary (this includes matrices with non-finite entries).
    pub fn new(matrix: Array2<Complex64>) -> Result<Self, GateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }

        if !rows.is_power_of_two() {
            return Err(GateError::InvalidDimensions);
        }

        if !Self::check_unitary(&matrix) {
            return Err(GateError::NonUnitary);
        }

        let num_qubits = rows.trailing_zeros() as usize;

        Ok(Self { matrix, num_qubits })
    }

    /// Single-qubit gate from a matrix known to be unitary.
    fn single(matrix: Array2<Complex64>) -> Gate {
        Gate {
            matrix,
            num_qubits: 1,
        }
    }

    fn check_unitary(matrix: &Array2<Complex64>) -> bool {
        let (rows, _) = matrix.dim();
        let eye = Array2::<Complex64>::eye(rows);
        let product = matrix.dot(&utils::dagger(matrix));

        product
            .iter()
            .zip(eye.iter())
            .all(|(a, b)| (*a - *b).norm() < 1e-6)
    }

    /// Expands a gate to act on `num_total_qubits`, applying it to `targets`
    /// when every qubit in `controls` is set and identity elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `GateError` if indices repeat or a qubit is both control and target.
    pub fn expand_gate(
        num_total_qubits: usize,
        gate: &Gate,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<Gate, GateError> {
        if let Some(dup) = utils::find_duplicate(targets) {
            return Err(GateError::DuplicateQubit(dup));
        }

        if let Some(dup) = utils::find_duplicate(controls) {
            return Err(GateError::DuplicateQubit(dup));
        }

        if let Some(&c) = controls.iter().find(|c| targets.contains(c)) {
            return Err(GateError::ControlTargetOverlap(c));
        }

        Ok(Gate {
            matrix: utils::expand_operator(num_total_qubits, &gate.matrix, targets, controls),
            num_qubits: num_total_qubits,
        })
    }

    // --- Standard Gates ---

    /// Pauli-X (NOT).
    pub fn x() -> Gate {
        Gate::single(arr2(&[
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        ]))
    }

    /// Pauli-Z.
    pub fn z() -> Gate {
        Gate::single(arr2(&[
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(-1.0, 0.0)],
        ]))
    }

    /// Hadamard.
    pub fn h() -> Gate {
        let factor = 1.0 / 2.0_f64.sqrt();
        Gate::single(arr2(&[
            [Complex64::new(factor, 0.0), Complex64::new(factor, 0.0)],
            [Complex64::new(factor, 0.0), Complex64::new(-factor, 0.0)],
        ]))
    }

    /// S gate (Z^1/2).
    pub fn s() -> Gate {
        Gate::single(arr2(&[
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(0.0, 1.0)],
        ]))
    }

    /// S† gate (Z^-1/2).
    pub fn sdg() -> Gate {
        Gate::single(arr2(&[
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(0.0, -1.0)],
        ]))
    }

    /// Rotation about the Y axis by `theta`: `[[cos θ/2, -sin θ/2], [sin θ/2, cos θ/2]]`.
    ///
    /// Goes through [`Gate::new`], so a non-finite angle is rejected as non-unitary.
    pub fn ry(theta: f64) -> Result<Gate, GateError> {
        let (sin, cos) = (theta / 2.0).sin_cos();
        Gate::new(arr2(&[
            [Complex64::new(cos, 0.0), Complex64::new(-sin, 0.0)],
            [Complex64::new(sin, 0.0), Complex64::new(cos, 0.0)],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn ry_half_turn_maps_zero_to_one() {
        let ry = Gate::ry(PI).unwrap();
        assert!(ry.matrix[[0, 0]].norm() < 1e-12);
        assert!((ry.matrix[[1, 0]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_rotation_is_rejected() {
        assert!(matches!(Gate::ry(f64::NAN), Err(GateError::NonUnitary)));
    }

    #[test]
    fn s_and_sdg_cancel() {
        let product = Gate::s().matrix.dot(&Gate::sdg().matrix);
        assert!(Gate::new(product.clone()).is_ok());
        assert!((product[[1, 1]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn expand_rejects_overlapping_control() {
        let res = Gate::expand_gate(2, &Gate::x(), &[0], &[0]);
        assert!(matches!(res, Err(GateError::ControlTargetOverlap(0))));
    }

    #[test]
    fn non_square_matrix_is_rejected() {
        let m = Array2::<Complex64>::zeros((2, 4));
        assert!(matches!(Gate::new(m), Err(GateError::NotSquareMatrix)));
    }
}
