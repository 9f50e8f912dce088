//! Abstract circuit descriptions and the executor boundary.
//!
//! The engine never touches qubits directly: it describes each round as a
//! [`Circuit`] and hands a batch of them to a [`CircuitExecutor`], which
//! answers with outcome counts per circuit. Bitstrings follow the usual
//! convention of classical bit 0 being the rightmost character.

use crate::core::errors::ExecutorError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome histogram of one circuit: bitstring -> number of shots.
pub type Counts = HashMap<String, usize>;

/// A single circuit operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    X(usize),
    Z(usize),
    H(usize),
    S(usize),
    Sdg(usize),
    Ry { qubit: usize, theta: f64 },
    Cx { control: usize, target: usize },
    Measure { qubit: usize, clbit: usize },
    Reset(usize),
}

/// Qubit count, classical register size and gate sequence of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub num_qubits: usize,
    pub num_clbits: usize,
    pub instructions: Vec<Instruction>,
}

impl Circuit {
    pub fn new(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            instructions: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn x(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::X(qubit))
    }

    pub fn z(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::Z(qubit))
    }

    pub fn h(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::H(qubit))
    }

    pub fn s(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::S(qubit))
    }

    pub fn sdg(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::Sdg(qubit))
    }

    pub fn ry(&mut self, theta: f64, qubit: usize) -> &mut Self {
        self.push(Instruction::Ry { qubit, theta })
    }

    pub fn cx(&mut self, control: usize, target: usize) -> &mut Self {
        self.push(Instruction::Cx { control, target })
    }

    pub fn measure(&mut self, qubit: usize, clbit: usize) -> &mut Self {
        self.push(Instruction::Measure { qubit, clbit })
    }

    pub fn reset(&mut self, qubit: usize) -> &mut Self {
        self.push(Instruction::Reset(qubit))
    }

    /// Measures qubit `q` into classical bit `q` for every qubit.
    pub fn measure_all(&mut self) -> &mut Self {
        for q in 0..self.num_qubits.min(self.num_clbits) {
            self.measure(q, q);
        }
        self
    }
}

/// Anything able to run a batch of circuits for a number of shots.
///
/// The returned vector is indexed like `circuits`. A failure is reported for
/// that circuit only; the other entries are unaffected.
pub trait CircuitExecutor: Send + Sync {
    fn execute(
        &self,
        circuits: &[Circuit],
        shots: usize,
        seed: u64,
    ) -> Vec<Result<Counts, ExecutorError>>;
}

impl<E: CircuitExecutor + ?Sized> CircuitExecutor for &E {
    fn execute(
        &self,
        circuits: &[Circuit],
        shots: usize,
        seed: u64,
    ) -> Vec<Result<Counts, ExecutorError>> {
        (**self).execute(circuits, shots, seed)
    }
}

impl<E: CircuitExecutor + ?Sized> CircuitExecutor for Box<E> {
    fn execute(
        &self,
        circuits: &[Circuit],
        shots: usize,
        seed: u64,
    ) -> Vec<Result<Counts, ExecutorError>> {
        (**self).execute(circuits, shots, seed)
    }
}

/// Most frequent bitstring; ties go to the lexicographically smallest one.
pub fn most_frequent(counts: &Counts) -> Option<&str> {
    counts
        .iter()
        .filter(|&(_, &n)| n > 0)
        .max_by(|(a, na), (b, nb)| na.cmp(nb).then_with(|| b.cmp(a)))
        .map(|(bits, _)| bits.as_str())
}

/// Splits a bitstring into classical bits, index 0 first.
///
/// Returns `None` unless the string has exactly `width` binary characters.
pub fn decode_bitstring(bits: &str, width: usize) -> Option<Vec<bool>> {
    let decoded: Vec<bool> = bits
        .chars()
        .rev()
        .map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (decoded.len() == width).then_some(decoded)
}
