//! Fabricated demo history.
//!
//! Nothing here is measured: records are drawn at random so a fresh timeline
//! has something to show. Only used when explicitly requested.

use super::{AnomalyClassifier, AnomalyRecord};
use crate::protocols::Protocol;
use chrono::{Days, NaiveDate};
use rand::{Rng, RngCore};

const PROTOCOLS: [Protocol; 3] = [Protocol::Bb84, Protocol::E91, Protocol::SixState];

/// One record per day for `days` days ending at `today`, most recent first.
///
/// QBER is uniform in [0, 0.3). Every seventh day is additionally flagged
/// with probability 0.3.
pub fn generate_history(
    days: usize,
    today: NaiveDate,
    classifier: &AnomalyClassifier,
    rng: &mut dyn RngCore,
) -> Vec<AnomalyRecord> {
    (0..days)
        .filter_map(|i| {
            let date = today.checked_sub_days(Days::new(i as u64))?;
            let qber: f64 = rng.random_range(0.0..0.3);
            let periodic = i % 7 == 0 && rng.random_bool(0.3);
            let verdict = classifier.classify(qber, periodic);
            let protocol = PROTOCOLS[rng.random_range(0..PROTOCOLS.len())];
            let affected_qubits = if verdict.is_anomaly {
                rng.random_range(1..=5)
            } else {
                0
            };

            Some(AnomalyRecord {
                date,
                qber,
                is_anomaly: verdict.is_anomaly,
                confidence: verdict.confidence,
                affected_qubits,
                protocol,
                severity: verdict.severity,
            })
        })
        .collect()
}
