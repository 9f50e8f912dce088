//! Anomaly classification and the bounded history of detection samples.
//!
//! The classifier is a plain threshold heuristic over the QBER; its constants
//! live in [`DetectionThresholds`] and come from configuration.

mod detector;
pub mod synthetic;

pub use detector::{
    DEFAULT_MAX_QUBITS, DetectionBatch, DetectionResult, EavesdropDetector, EveStrategy,
};

use crate::error::ConfigError;
use crate::protocols::Protocol;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// Classifier constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// QBER above this is anomalous.
    pub anomaly_qber: f64,
    /// QBER above this is High severity.
    pub high_severity_qber: f64,
    /// Confidence is `min(qber * confidence_slope, 1)` for anomalous samples.
    pub confidence_slope: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            anomaly_qber: 0.15,
            high_severity_qber: 0.25,
            confidence_slope: 6.67,
        }
    }
}

impl DetectionThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |x: f64| (0.0..=1.0).contains(&x);
        if !in_unit(self.anomaly_qber) || !in_unit(self.high_severity_qber) {
            return Err(ConfigError::Invalid(format!(
                "QBER thresholds must lie in [0, 1], got {} and {}",
                self.anomaly_qber, self.high_severity_qber
            )));
        }
        if self.anomaly_qber > self.high_severity_qber {
            return Err(ConfigError::Invalid(format!(
                "anomaly threshold {} exceeds high-severity threshold {}",
                self.anomaly_qber, self.high_severity_qber
            )));
        }
        if !(self.confidence_slope.is_finite() && self.confidence_slope >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence slope must be a non-negative number, got {}",
                self.confidence_slope
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Verdict for one QBER sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub is_anomaly: bool,
    /// In [0, 1]; 0.0 whenever the QBER is at or below the anomaly threshold.
    pub confidence: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyClassifier {
    thresholds: DetectionThresholds,
}

impl AnomalyClassifier {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }

    /// Labels a QBER sample.
    ///
    /// `adversary_present` forces the anomaly flag; confidence and severity
    /// still follow the QBER alone. A NaN QBER is treated as clean.
    pub fn classify(&self, qber: f64, adversary_present: bool) -> Classification {
        let t = &self.thresholds;
        let above = qber > t.anomaly_qber;

        let severity = if qber > t.high_severity_qber {
            Severity::High
        } else if above {
            Severity::Medium
        } else {
            Severity::Low
        };
        let confidence = if above {
            (qber * t.confidence_slope).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Classification {
            is_anomaly: above || adversary_present,
            confidence,
            severity,
        }
    }
}

/// One classified detection sample, serialised flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub date: NaiveDate,
    pub qber: f64,
    pub is_anomaly: bool,
    pub confidence: f64,
    pub affected_qubits: usize,
    pub protocol: Protocol,
    pub severity: Severity,
}

/// Capacity-bounded record list, most recent first.
#[derive(Debug, Clone)]
pub struct AnomalyHistory {
    capacity: usize,
    records: VecDeque<AnomalyRecord>,
}

impl Default for AnomalyHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl AnomalyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Inserts `record` as the most recent entry, evicting the oldest ones
    /// beyond capacity.
    pub fn push(&mut self, record: AnomalyRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    /// Appends `records` (already newest first) behind the current entries.
    pub fn extend_older<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = AnomalyRecord>,
    {
        let room = self.capacity.saturating_sub(self.records.len());
        self.records.extend(records.into_iter().take(room));
    }

    pub fn records(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeline(&self) -> Timeline {
        let total_anomalies = self.records.iter().filter(|r| r.is_anomaly).count();
        let average_qber = if self.records.is_empty() {
            0.0
        } else {
            self.records.iter().map(|r| r.qber).sum::<f64>() / self.records.len() as f64
        };

        Timeline {
            anomalies: self.records.iter().cloned().collect(),
            total_anomalies,
            average_qber,
            last_updated: Utc::now(),
        }
    }
}

/// Snapshot of the history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Most recent first.
    pub anomalies: Vec<AnomalyRecord>,
    pub total_anomalies: usize,
    pub average_qber: f64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn record(day: u32, qber: f64) -> AnomalyRecord {
        let c = AnomalyClassifier::default().classify(qber, false);
        AnomalyRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            qber,
            is_anomaly: c.is_anomaly,
            confidence: c.confidence,
            affected_qubits: 0,
            protocol: Protocol::Bb84,
            severity: c.severity,
        }
    }

    #[test]
    fn severity_bands() {
        let c = AnomalyClassifier::default();
        assert_eq!(c.classify(0.0, false).severity, Severity::Low);
        assert_eq!(c.classify(0.15, false).severity, Severity::Low);
        assert_eq!(c.classify(0.2, false).severity, Severity::Medium);
        assert_eq!(c.classify(0.25, false).severity, Severity::Medium);
        assert_eq!(c.classify(0.26, false).severity, Severity::High);
    }

    #[test]
    fn high_qber_saturates_confidence() {
        let c = AnomalyClassifier::default().classify(0.30, false);
        assert!(c.is_anomaly);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn confidence_follows_slope_below_saturation() {
        let c = AnomalyClassifier::new(DetectionThresholds {
            confidence_slope: 2.0,
            ..Default::default()
        })
        .classify(0.2, false);
        assert!(c.is_anomaly);
        assert!((c.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn low_qber_is_clean() {
        let c = AnomalyClassifier::default().classify(0.10, false);
        assert!(!c.is_anomaly);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.severity, Severity::Low);
    }

    #[test]
    fn presence_signal_flags_without_raising_severity() {
        let c = AnomalyClassifier::default().classify(0.05, true);
        assert!(c.is_anomaly);
        assert_eq!(c.confidence, 0.0);
        assert_eq!(c.severity, Severity::Low);
    }

    #[test]
    fn nan_qber_is_not_anomalous() {
        let c = AnomalyClassifier::default().classify(f64::NAN, false);
        assert!(!c.is_anomaly);
        assert_eq!(c.severity, Severity::Low);
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let t = DetectionThresholds {
            anomaly_qber: 0.3,
            high_severity_qber: 0.2,
            ..Default::default()
        };
        assert!(t.validate().is_err());
        assert!(DetectionThresholds::default().validate().is_ok());
    }

    #[test]
    fn history_evicts_oldest() {
        let mut history = AnomalyHistory::new(3);
        for day in 1..=5 {
            history.push(record(day, 0.01 * day as f64));
        }
        let days: Vec<u32> = history.records().map(|r| r.date.day0() + 1).collect();
        assert_eq!(days, vec![5, 4, 3]);
    }

    #[test]
    fn older_records_fill_remaining_room_only() {
        let mut history = AnomalyHistory::new(3);
        history.push(record(10, 0.0));
        history.extend_older((1..=5).rev().map(|d| record(d, 0.0)));
        let days: Vec<u32> = history.records().map(|r| r.date.day0() + 1).collect();
        assert_eq!(days, vec![10, 5, 4]);
    }

    #[test]
    fn timeline_summarises_window() {
        let mut history = AnomalyHistory::default();
        history.push(record(1, 0.10));
        history.push(record(2, 0.30));

        let timeline = history.timeline();
        assert_eq!(timeline.total_anomalies, 1);
        assert!((timeline.average_qber - 0.20).abs() < 1e-12);
        assert_eq!(timeline.anomalies[0].qber, 0.30);
    }

    #[test]
    fn empty_timeline_averages_to_zero() {
        let timeline = AnomalyHistory::default().timeline();
        assert_eq!(timeline.average_qber, 0.0);
        assert_eq!(timeline.total_anomalies, 0);
        assert!(timeline.anomalies.is_empty());
    }

    #[test]
    fn record_serialises_flat() {
        let json = serde_json::to_value(record(3, 0.2)).unwrap();
        assert_eq!(json["date"], "2024-01-03");
        assert_eq!(json["protocol"], "BB84");
        assert_eq!(json["severity"], "Medium");
        assert_eq!(json["is_anomaly"], true);
    }
}
