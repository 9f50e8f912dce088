//! Simulator facade: validated entry points over sessions and detection.

use crate::config::SimulationConfig;
use crate::detection::synthetic::generate_history;
use crate::detection::{
    AnomalyClassifier, AnomalyHistory, DetectionResult, EavesdropDetector, EveStrategy, Timeline,
};
use crate::error::SimulationError;
use crate::model::MeasurementModel;
use crate::protocols::bb84::Bb84Details;
use crate::protocols::{Protocol, Session, SessionPlan, measure_session, plan_session};
use crate::sampler::Sampler;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Keys and statistics of one run over every protocol.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub keys: BTreeMap<Protocol, String>,
    pub key_lengths: BTreeMap<Protocol, usize>,
    pub entropy: BTreeMap<Protocol, f64>,
    /// BB84 QBER.
    pub qber: f64,
    /// Wall-clock seconds for the whole run.
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
    /// Rounds per protocol.
    pub num_qubits: usize,
    pub bb84_details: Bb84Details,
}

pub struct QkdSimulator {
    config: SimulationConfig,
    model: Box<dyn MeasurementModel>,
    rng: Mutex<ChaCha8Rng>,
    detector: EavesdropDetector<Sampler>,
}

impl QkdSimulator {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let model = config.build_model()?;
        let detection = &config.detection;
        let detector = EavesdropDetector::new(
            config.build_sampler()?,
            AnomalyClassifier::new(detection.thresholds),
            AnomalyHistory::new(detection.history_capacity),
        )
        .with_limits(detection.max_qubits, config.max_rounds);

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let simulator = Self {
            model,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            detector,
            config,
        };
        if simulator.config.detection.synthetic_history {
            simulator.load_synthetic_history();
        }
        Ok(simulator)
    }

    /// Replaces the configured measurement model.
    pub fn with_model<M: MeasurementModel + 'static>(mut self, model: M) -> Self {
        self.model = Box::new(model);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn check_rounds(&self, n: i64) -> Result<usize, SimulationError> {
        let max = self.config.max_rounds;
        usize::try_from(n)
            .ok()
            .filter(|&n| (1..=max).contains(&n))
            .ok_or(SimulationError::InvalidRounds { requested: n, max })
    }

    /// Runs a single protocol for `n` rounds.
    pub fn simulate_protocol(&self, protocol: Protocol, n: i64) -> Result<Session, SimulationError> {
        let n = self.check_rounds(n)?;
        let driver = protocol.driver();
        let plan = plan_session(driver.as_ref(), n, &mut *self.rng.lock());
        Ok(measure_session(driver.as_ref(), self.model.as_ref(), plan))
    }

    /// Runs every protocol for `n` rounds.
    pub fn run_simulation(&self, n: i64) -> Result<SimulationResult, SimulationError> {
        let rounds = self.check_rounds(n)?;
        let start = Instant::now();

        // Only the draws hold the lock; batches are measured without it.
        let drivers: Vec<_> = Protocol::ALL.iter().map(|p| p.driver()).collect();
        let plans: Vec<SessionPlan> = {
            let mut rng = self.rng.lock();
            drivers
                .iter()
                .map(|driver| plan_session(driver.as_ref(), rounds, &mut *rng))
                .collect()
        };
        let sessions: Vec<Session> = drivers
            .iter()
            .zip(plans)
            .map(|(driver, plan)| measure_session(driver.as_ref(), self.model.as_ref(), plan))
            .collect();

        let mut keys = BTreeMap::new();
        let mut key_lengths = BTreeMap::new();
        let mut entropy = BTreeMap::new();
        let mut bb84 = None;
        for session in &sessions {
            let stats = session.statistics();
            keys.insert(session.protocol(), session.key_string());
            key_lengths.insert(session.protocol(), stats.length);
            entropy.insert(session.protocol(), stats.entropy);
            if session.protocol() == Protocol::Bb84 {
                bb84 = Some((stats.qber.unwrap_or(0.0), Bb84Details::from_session(session)));
            }
        }
        let (qber, bb84_details) = bb84.unwrap_or_default();

        let execution_time = start.elapsed().as_secs_f64();
        info!(rounds, qber, execution_time, "simulation complete");

        Ok(SimulationResult {
            keys,
            key_lengths,
            entropy,
            qber,
            execution_time,
            timestamp: Utc::now(),
            num_qubits: rounds,
            bb84_details,
        })
    }

    pub fn detect(
        &self,
        num_qubits: usize,
        num_rounds: usize,
        eve_present: bool,
        strategy: EveStrategy,
    ) -> Result<DetectionResult, SimulationError> {
        let batch = self.detector.prepare(
            num_qubits,
            num_rounds,
            eve_present,
            strategy,
            &mut *self.rng.lock(),
        )?;
        Ok(self.detector.run(batch))
    }

    pub fn timeline(&self) -> Timeline {
        self.detector.timeline()
    }

    /// Fills the free part of the history window with fabricated records.
    pub fn load_synthetic_history(&self) {
        let days = self.config.detection.history_capacity;
        let classifier = AnomalyClassifier::new(self.config.detection.thresholds);
        let records = {
            let mut rng = self.rng.lock();
            generate_history(days, Utc::now().date_naive(), &classifier, &mut *rng)
        };
        info!(days, "loaded synthetic anomaly history");
        self.detector.backfill(records);
    }
}
