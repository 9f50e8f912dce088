//! Matrix helpers shared by gates, measurements and channels.
//!
//! Everything here works on dense `Array2<Complex64>` operators and on the
//! little-endian qubit numbering used across the crate (qubit `q` is bit `q`
//! of a basis-state index).

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::collections::HashSet;

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|c| c.conj())
}

/// Lifts a local operator acting on `targets` (optionally controlled by
/// `controls`) to the full `2^n x 2^n` register.
///
/// Columns whose control bits are not all set are left as identity. For the
/// others, the local matrix is scattered onto the target bit positions while
/// every passive bit is carried over unchanged.
pub fn expand_operator(
    num_total_qubits: usize,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array2<Complex64> {
    let dim = 1 << num_total_qubits;
    let mut full = Array2::<Complex64>::zeros((dim, dim));

    let control_mask = controls.iter().fold(0usize, |mask, &c| mask | (1 << c));
    let target_mask = targets.iter().fold(0usize, |mask, &t| mask | (1 << t));
    let passive_mask = !target_mask;

    for col in 0..dim {
        if col & control_mask != control_mask {
            full[[col, col]] = Complex64::new(1.0, 0.0);
            continue;
        }

        let local_col = gather_bits(col, targets);
        for local_row in 0..matrix.nrows() {
            let val = matrix[[local_row, local_col]];
            if val.norm_sqr() < f64::EPSILON {
                continue;
            }
            let row = (col & passive_mask) | scatter_bits(local_row, targets);
            full[[row, col]] = val;
        }
    }
    full
}

/// Packs the bits of `value` found at `positions` into a compact integer.
fn gather_bits(value: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .filter(|&(_, &pos)| (value >> pos) & 1 == 1)
        .fold(0, |acc, (i, _)| acc | (1 << i))
}

/// Inverse of [`gather_bits`]: bit `i` of `compact` lands on `positions[i]`.
fn scatter_bits(compact: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .filter(|&(i, _)| (compact >> i) & 1 == 1)
        .fold(0, |acc, (_, &pos)| acc | (1 << pos))
}

/// First index that appears twice, if any.
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Checks $\sum_k M_k^\dagger M_k = I$ for Kraus or measurement operators.
pub fn check_completeness(ops: &[Array2<Complex64>], dim: usize) -> bool {
    let eye = Array2::<Complex64>::eye(dim);
    let sum = ops
        .iter()
        .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, op| {
            acc + dagger(op).dot(op)
        });
    sum.iter()
        .zip(eye.iter())
        .all(|(a, b)| (a - b).norm() < 1e-9)
}

/// Outer product $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn expanding_x_on_second_qubit_flips_bit_one() {
        let x = array![[c(0.0), c(1.0)], [c(1.0), c(0.0)]];
        let full = expand_operator(2, &x, &[1], &[]);

        // |00> -> |10> (index 0 -> index 2)
        assert_eq!(full[[2, 0]], c(1.0));
        assert_eq!(full[[0, 0]], c(0.0));
        // |01> -> |11> (index 1 -> index 3)
        assert_eq!(full[[3, 1]], c(1.0));
    }

    #[test]
    fn controlled_expansion_leaves_inactive_columns_alone() {
        let x = array![[c(0.0), c(1.0)], [c(1.0), c(0.0)]];
        let cnot = expand_operator(2, &x, &[1], &[0]);

        assert_eq!(cnot[[0, 0]], c(1.0));
        assert_eq!(cnot[[2, 2]], c(1.0));
        assert_eq!(cnot[[3, 1]], c(1.0));
        assert_eq!(cnot[[1, 3]], c(1.0));
    }

    #[test]
    fn duplicate_detection() {
        assert_eq!(find_duplicate(&[0, 1, 2]), None);
        assert_eq!(find_duplicate(&[0, 1, 0]), Some(0));
    }

    #[test]
    fn projectors_are_complete() {
        let zero = array![c(1.0), c(0.0)];
        let one = array![c(0.0), c(1.0)];
        let ops = vec![outer_product(&zero, &zero), outer_product(&one, &one)];
        assert!(check_completeness(&ops, 2));
        assert!(!check_completeness(&ops[..1], 2));
    }
}
