//! BB84-style eavesdropping detection over multi-qubit rounds.

use super::{AnomalyClassifier, AnomalyHistory, AnomalyRecord, Severity, Timeline};
use crate::circuit::{Circuit, CircuitExecutor, decode_bitstring, most_frequent};
use crate::error::SimulationError;
use crate::protocols::Protocol;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_QUBITS: usize = 5;
const DEFAULT_MAX_ROUNDS: usize = 10_000;

/// Chance that the trojan strategy phase-flips a qubit.
pub const TROJAN_PHASE_PROBABILITY: f64 = 0.3;

/// How Eve interferes with the qubits in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EveStrategy {
    /// Measure every qubit, then resend a fresh random bit in a random basis.
    InterceptResend,
    /// Entangle neighbouring qubits with a CX chain.
    Entanglement,
    /// Random phase flips.
    Trojan,
}

impl EveStrategy {
    pub const ALL: [EveStrategy; 3] = [
        EveStrategy::InterceptResend,
        EveStrategy::Entanglement,
        EveStrategy::Trojan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EveStrategy::InterceptResend => "intercept-resend",
            EveStrategy::Entanglement => "entanglement",
            EveStrategy::Trojan => "trojan",
        }
    }

    fn apply(self, circuit: &mut Circuit, rng: &mut dyn RngCore) {
        let n = circuit.num_qubits;
        match self {
            EveStrategy::InterceptResend => {
                for q in 0..n {
                    circuit.measure(q, q).reset(q);
                    if rng.random_bool(0.5) {
                        circuit.x(q);
                    }
                    if rng.random_bool(0.5) {
                        circuit.h(q);
                    }
                }
            }
            EveStrategy::Entanglement => {
                for q in 1..n {
                    circuit.cx(q - 1, q);
                }
            }
            EveStrategy::Trojan => {
                for q in 0..n {
                    if rng.random_bool(TROJAN_PHASE_PROBABILITY) {
                        circuit.z(q);
                    }
                }
            }
        }
    }
}

impl fmt::Display for EveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EveStrategy {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "intercept-resend" | "intercept" => Ok(EveStrategy::InterceptResend),
            "entanglement" => Ok(EveStrategy::Entanglement),
            "trojan" => Ok(EveStrategy::Trojan),
            _ => Err(SimulationError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Outcome of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub eavesdropping_detected: bool,
    pub qber: f64,
    pub confidence: f64,
    pub severity: Severity,
    /// Reported only when Eve was present and the run flagged her.
    pub eve_strategy: Option<EveStrategy>,
    pub affected_qubits: usize,
    /// Per sifted round, fraction of qubits that disagree with Alice's bit.
    pub error_rates: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct RoundSettings {
    bit: bool,
    alice_diagonal: bool,
    bob_diagonal: bool,
}

impl RoundSettings {
    fn draw(rng: &mut dyn RngCore) -> Self {
        Self {
            bit: rng.random_bool(0.5),
            alice_diagonal: rng.random_bool(0.5),
            bob_diagonal: rng.random_bool(0.5),
        }
    }

    fn sifted(&self) -> bool {
        self.alice_diagonal == self.bob_diagonal
    }
}

/// A validated detection run with all of its randomness drawn.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    num_qubits: usize,
    eve_present: bool,
    eve: Option<EveStrategy>,
    rounds: Vec<RoundSettings>,
    circuits: Vec<Circuit>,
    seed: u64,
}

/// Runs detection rounds on a circuit executor and records every verdict.
pub struct EavesdropDetector<E> {
    executor: E,
    classifier: AnomalyClassifier,
    history: Mutex<AnomalyHistory>,
    max_qubits: usize,
    max_rounds: usize,
}

impl<E: CircuitExecutor> EavesdropDetector<E> {
    pub fn new(executor: E, classifier: AnomalyClassifier, history: AnomalyHistory) -> Self {
        Self {
            executor,
            classifier,
            history: Mutex::new(history),
            max_qubits: DEFAULT_MAX_QUBITS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_limits(mut self, max_qubits: usize, max_rounds: usize) -> Self {
        self.max_qubits = max_qubits;
        self.max_rounds = max_rounds;
        self
    }

    /// Sends `num_rounds` batches of `num_qubits` identically prepared qubits
    /// and classifies the resulting error rate.
    pub fn detect(
        &self,
        num_qubits: usize,
        num_rounds: usize,
        eve_present: bool,
        strategy: EveStrategy,
        rng: &mut dyn RngCore,
    ) -> Result<DetectionResult, SimulationError> {
        let batch = self.prepare(num_qubits, num_rounds, eve_present, strategy, rng)?;
        Ok(self.run(batch))
    }

    /// Validates the request and draws every random choice of a run: round
    /// settings, Eve's per-qubit choices and the executor seed.
    pub fn prepare(
        &self,
        num_qubits: usize,
        num_rounds: usize,
        eve_present: bool,
        strategy: EveStrategy,
        rng: &mut dyn RngCore,
    ) -> Result<DetectionBatch, SimulationError> {
        if num_qubits == 0 || num_qubits > self.max_qubits {
            return Err(SimulationError::InvalidQubits {
                requested: num_qubits,
                max: self.max_qubits,
            });
        }
        if num_rounds == 0 || num_rounds > self.max_rounds {
            return Err(SimulationError::InvalidRounds {
                requested: i64::try_from(num_rounds).unwrap_or(i64::MAX),
                max: self.max_rounds,
            });
        }

        let eve = eve_present.then_some(strategy);
        let rounds: Vec<RoundSettings> = (0..num_rounds).map(|_| RoundSettings::draw(rng)).collect();
        let circuits = rounds
            .iter()
            .map(|round| Self::round_circuit(round, num_qubits, eve, rng))
            .collect();

        Ok(DetectionBatch {
            num_qubits,
            eve_present,
            eve,
            rounds,
            circuits,
            seed: rng.next_u64(),
        })
    }

    /// Executes a prepared batch, classifies it and records the verdict.
    pub fn run(&self, batch: DetectionBatch) -> DetectionResult {
        let DetectionBatch {
            num_qubits,
            eve_present,
            eve,
            rounds,
            circuits,
            seed,
        } = batch;

        debug!(num_qubits, num_rounds = rounds.len(), ?eve, "running detection batch");
        let mut results = self.executor.execute(&circuits, 1, seed).into_iter();

        let mut error_rates = Vec::new();
        let mut affected = vec![false; num_qubits];
        for (i, round) in rounds.iter().enumerate() {
            let bits = match results.next() {
                Some(Ok(counts)) => most_frequent(&counts)
                    .and_then(|bits| decode_bitstring(bits, num_qubits)),
                Some(Err(err)) => {
                    warn!(round = i, error = %err, "detection round failed");
                    None
                }
                None => None,
            }
            .unwrap_or_else(|| {
                warn!(round = i, "no usable detection outcome, assuming all zeros");
                vec![false; num_qubits]
            });

            if !round.sifted() {
                continue;
            }
            let mut errors = 0;
            for (q, &bit) in bits.iter().enumerate() {
                if bit != round.bit {
                    errors += 1;
                    affected[q] = true;
                }
            }
            error_rates.push(errors as f64 / num_qubits as f64);
        }

        let qber = if error_rates.is_empty() {
            0.0
        } else {
            error_rates.iter().sum::<f64>() / error_rates.len() as f64
        };
        let verdict = self.classifier.classify(qber, eve_present);
        let affected_qubits = if verdict.is_anomaly {
            affected.iter().filter(|&&a| a).count()
        } else {
            0
        };

        let timestamp = Utc::now();
        self.history.lock().push(AnomalyRecord {
            date: timestamp.date_naive(),
            qber,
            is_anomaly: verdict.is_anomaly,
            confidence: verdict.confidence,
            affected_qubits,
            protocol: Protocol::Bb84,
            severity: verdict.severity,
        });

        info!(
            qber,
            detected = verdict.is_anomaly,
            severity = ?verdict.severity,
            sifted = error_rates.len(),
            "detection run complete"
        );

        DetectionResult {
            eavesdropping_detected: verdict.is_anomaly,
            qber,
            confidence: verdict.confidence,
            severity: verdict.severity,
            eve_strategy: eve.filter(|_| verdict.is_anomaly),
            affected_qubits,
            error_rates,
            timestamp,
        }
    }

    pub fn timeline(&self) -> Timeline {
        self.history.lock().timeline()
    }

    /// Seeds the history with older records, e.g. demo data.
    pub fn backfill<I>(&self, records: I)
    where
        I: IntoIterator<Item = AnomalyRecord>,
    {
        self.history.lock().extend_older(records);
    }

    fn round_circuit(
        round: &RoundSettings,
        num_qubits: usize,
        eve: Option<EveStrategy>,
        rng: &mut dyn RngCore,
    ) -> Circuit {
        let mut circuit = Circuit::new(num_qubits, num_qubits);
        for q in 0..num_qubits {
            if round.bit {
                circuit.x(q);
            }
            if round.alice_diagonal {
                circuit.h(q);
            }
        }

        if let Some(strategy) = eve {
            strategy.apply(&mut circuit, rng);
        }

        for q in 0..num_qubits {
            if round.bob_diagonal {
                circuit.h(q);
            }
            circuit.measure(q, q);
        }
        circuit
    }
}
