//! Measurement model: turns per-round preparation and measurement settings
//! into outcome bits.
//!
//! Two implementations are provided. [`CircuitModel`] compiles every request
//! to a [`Circuit`] and delegates to a [`CircuitExecutor`]; [`BornRuleModel`]
//! samples the same statistics analytically and lets the angle law be
//! swapped for a noise model.

use crate::circuit::{Circuit, CircuitExecutor, Counts, decode_bitstring, most_frequent};
use crate::core::errors::ExecutorError;
use crate::error::MeasurementUnavailable;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Single-qubit bases. The three are pairwise mutually unbiased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Computational basis {|0>, |1>} (Z).
    Rectilinear,
    /// Hadamard basis {|+>, |->} (X).
    Diagonal,
    /// Y basis {|+i>, |-i>}.
    Circular,
}

impl Basis {
    /// Bases used by BB84.
    pub const CONJUGATE: [Basis; 2] = [Basis::Rectilinear, Basis::Diagonal];
    /// Bases used by the Six-State protocol.
    pub const ALL: [Basis; 3] = [Basis::Rectilinear, Basis::Diagonal, Basis::Circular];

    /// Appends the rotation taking |0>/|1> to this basis' eigenstates.
    fn prepare(self, circuit: &mut Circuit, qubit: usize) {
        match self {
            Basis::Rectilinear => {}
            Basis::Diagonal => {
                circuit.h(qubit);
            }
            Basis::Circular => {
                circuit.h(qubit).s(qubit);
            }
        }
    }

    /// Appends the inverse rotation so a Z measurement reads this basis.
    fn unprepare(self, circuit: &mut Circuit, qubit: usize) {
        match self {
            Basis::Rectilinear => {}
            Basis::Diagonal => {
                circuit.h(qubit);
            }
            Basis::Circular => {
                circuit.sdg(qubit).h(qubit);
            }
        }
    }
}

/// What a round asks the model to measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementRequest {
    /// `bit` encoded in `basis`, read out in `measured_in`.
    Encoded {
        bit: bool,
        basis: Basis,
        measured_in: Basis,
    },
    /// |+> rotated by `Ry(2 * angle)`, read out in Z.
    Rotated { angle: f64 },
    /// Bell pair with `Ry(2 * angle)` applied locally on each side, both read out in Z.
    Entangled { alice_angle: f64, bob_angle: f64 },
}

impl MeasurementRequest {
    /// Number of outcome bits this request produces.
    pub fn width(&self) -> usize {
        match self {
            MeasurementRequest::Entangled { .. } => 2,
            _ => 1,
        }
    }

    /// Outcome used when the backend cannot deliver one.
    pub fn fallback(&self) -> Outcome {
        match self {
            MeasurementRequest::Entangled { .. } => Outcome::Pair {
                alice: false,
                bob: false,
            },
            _ => Outcome::Bit(false),
        }
    }

    /// Circuit description handed to the executor.
    pub fn to_circuit(&self) -> Circuit {
        match *self {
            MeasurementRequest::Encoded {
                bit,
                basis,
                measured_in,
            } => {
                let mut c = Circuit::new(1, 1);
                if bit {
                    c.x(0);
                }
                basis.prepare(&mut c, 0);
                measured_in.unprepare(&mut c, 0);
                c.measure(0, 0);
                c
            }
            MeasurementRequest::Rotated { angle } => {
                let mut c = Circuit::new(1, 1);
                c.h(0).ry(2.0 * angle, 0).measure(0, 0);
                c
            }
            MeasurementRequest::Entangled {
                alice_angle,
                bob_angle,
            } => {
                let mut c = Circuit::new(2, 2);
                c.h(0)
                    .cx(0, 1)
                    .ry(2.0 * alice_angle, 0)
                    .ry(2.0 * bob_angle, 1)
                    .measure_all();
                c
            }
        }
    }
}

/// Raw measurement result of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Bit(bool),
    /// Alice's qubit is classical bit 0, Bob's is classical bit 1.
    Pair { alice: bool, bob: bool },
}

impl Outcome {
    /// Parses an executor bitstring (classical bit 0 rightmost).
    pub fn from_bitstring(bits: &str, width: usize) -> Option<Outcome> {
        let parsed = decode_bitstring(bits, width)?;

        match (width, parsed.as_slice()) {
            (1, &[bit]) => Some(Outcome::Bit(bit)),
            (2, &[alice, bob]) => Some(Outcome::Pair { alice, bob }),
            _ => None,
        }
    }
}

/// Seam between protocol drivers and whatever produces measurement outcomes.
///
/// Rounds are independent: outcome `i` may only depend on request `i` and
/// the batch seed.
pub trait MeasurementModel: Send + Sync {
    /// One result per request, in request order.
    fn try_measure_batch(
        &self,
        requests: &[MeasurementRequest],
        seed: u64,
    ) -> Vec<Result<Outcome, MeasurementUnavailable>>;

    /// Like [`try_measure_batch`](Self::try_measure_batch), with every
    /// failure replaced by the request's fallback outcome.
    fn measure_batch(&self, requests: &[MeasurementRequest], seed: u64) -> Vec<Outcome> {
        let mut results = self.try_measure_batch(requests, seed).into_iter();

        requests
            .iter()
            .enumerate()
            .map(|(round, request)| match results.next() {
                Some(Ok(outcome)) => outcome,
                Some(Err(err)) => {
                    warn!(round, error = %err, "measurement unavailable, using fallback outcome");
                    request.fallback()
                }
                None => {
                    warn!(round, "no measurement returned, using fallback outcome");
                    request.fallback()
                }
            })
            .collect()
    }
}

/// Measurement model that runs every round as a circuit on an executor.
#[derive(Debug, Clone)]
pub struct CircuitModel<E> {
    executor: E,
    shots: usize,
}

impl<E: CircuitExecutor> CircuitModel<E> {
    /// Single-shot model over `executor`.
    pub fn new(executor: E) -> Self {
        Self { executor, shots: 1 }
    }

    /// Runs each circuit `shots` times and keeps the most frequent outcome.
    pub fn with_shots(mut self, shots: usize) -> Self {
        self.shots = shots;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn decode(
        request: &MeasurementRequest,
        counts: &Counts,
    ) -> Result<Outcome, MeasurementUnavailable> {
        let width = request.width();
        let top = most_frequent(counts);
        top.and_then(|bits| Outcome::from_bitstring(bits, width))
            .ok_or_else(|| MeasurementUnavailable::Ambiguous {
                expected_width: width,
                observed: top.map(str::to_owned),
            })
    }
}

impl<E: CircuitExecutor> MeasurementModel for CircuitModel<E> {
    fn try_measure_batch(
        &self,
        requests: &[MeasurementRequest],
        seed: u64,
    ) -> Vec<Result<Outcome, MeasurementUnavailable>> {
        let circuits: Vec<Circuit> = requests.iter().map(MeasurementRequest::to_circuit).collect();
        let mut results = self.executor.execute(&circuits, self.shots, seed).into_iter();

        requests
            .iter()
            .enumerate()
            .map(|(i, request)| {
                let counts = results
                    .next()
                    .unwrap_or(Err(ExecutorError::MissingResult(i)))?;
                Self::decode(request, &counts)
            })
            .collect()
    }
}

/// Probability that two settings `delta` radians apart agree.
pub type AgreementFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Ideal Malus/Born law: `cos^2(delta)`.
pub fn cos_squared(delta: f64) -> f64 {
    delta.cos().powi(2)
}

/// Analytic measurement model reproducing single-shot quantum statistics.
///
/// - basis-encoded qubits: matching bases return the prepared bit, any
///   mismatch returns a uniform bit;
/// - angle-encoded qubits: agreement follows the configured [`AgreementFn`];
/// - every outcome bit is then flipped with `flip_probability`.
#[derive(Clone)]
pub struct BornRuleModel {
    agreement: AgreementFn,
    flip_probability: f64,
}

impl Default for BornRuleModel {
    fn default() -> Self {
        Self {
            agreement: Arc::new(cos_squared),
            flip_probability: 0.0,
        }
    }
}

impl fmt::Debug for BornRuleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BornRuleModel")
            .field("flip_probability", &self.flip_probability)
            .finish_non_exhaustive()
    }
}

impl BornRuleModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the angle law, e.g. with a reduced-visibility curve.
    pub fn with_agreement<F>(mut self, agreement: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.agreement = Arc::new(agreement);
        self
    }

    pub fn with_flip_probability(mut self, p: f64) -> Self {
        self.flip_probability = p;
        self
    }

    /// Agreement probability for settings `delta` radians apart.
    pub fn agreement_probability(&self, delta: f64) -> f64 {
        (self.agreement)(delta)
    }

    fn noisy<R: Rng + ?Sized>(&self, bit: bool, rng: &mut R) -> bool {
        bit ^ (rng.random::<f64>() < self.flip_probability)
    }

    /// Samples one outcome for `request`.
    pub fn sample<R: Rng + ?Sized>(&self, request: &MeasurementRequest, rng: &mut R) -> Outcome {
        match *request {
            MeasurementRequest::Encoded {
                bit,
                basis,
                measured_in,
            } => {
                let raw = if basis == measured_in {
                    bit
                } else {
                    rng.random_bool(0.5)
                };
                Outcome::Bit(self.noisy(raw, rng))
            }
            MeasurementRequest::Rotated { angle } => {
                // |+> sits at pi/4 from |0>; the rotation moves it by `angle`
                let reads_zero = rng.random::<f64>() < self.agreement_probability(FRAC_PI_4 + angle);
                Outcome::Bit(self.noisy(!reads_zero, rng))
            }
            MeasurementRequest::Entangled {
                alice_angle,
                bob_angle,
            } => {
                let alice = rng.random_bool(0.5);
                let agree =
                    rng.random::<f64>() < self.agreement_probability(alice_angle - bob_angle);
                let bob = if agree { alice } else { !alice };
                Outcome::Pair {
                    alice: self.noisy(alice, rng),
                    bob: self.noisy(bob, rng),
                }
            }
        }
    }
}

impl MeasurementModel for BornRuleModel {
    fn try_measure_batch(
        &self,
        requests: &[MeasurementRequest],
        seed: u64,
    ) -> Vec<Result<Outcome, MeasurementUnavailable>> {
        requests
            .par_iter()
            .enumerate()
            .map(|(i, request)| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(i as u64);
                Ok(self.sample(request, &mut rng))
            })
            .collect()
    }
}

impl<M: MeasurementModel + ?Sized> MeasurementModel for Box<M> {
    fn try_measure_batch(
        &self,
        requests: &[MeasurementRequest],
        seed: u64,
    ) -> Vec<Result<Outcome, MeasurementUnavailable>> {
        (**self).try_measure_batch(requests, seed)
    }
}
