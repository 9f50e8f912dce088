use chrono::NaiveDate;
use qkd_sim::detection::{
    AnomalyClassifier, AnomalyHistory, AnomalyRecord, EveStrategy, Severity,
};
use qkd_sim::protocols::Protocol;
use qkd_sim::{QkdSimulator, SimulationConfig};

fn simulator(seed: u64) -> QkdSimulator {
    QkdSimulator::new(SimulationConfig {
        seed: Some(seed),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn classifier_reference_points() {
    let classifier = AnomalyClassifier::default();

    let high = classifier.classify(0.30, false);
    assert!(high.is_anomaly);
    assert_eq!(high.severity, Severity::High);
    assert_eq!(high.confidence, 1.0);

    let clean = classifier.classify(0.10, false);
    assert!(!clean.is_anomaly);
    assert_eq!(clean.confidence, 0.0);
    assert_eq!(clean.severity, Severity::Low);
}

#[test]
fn history_keeps_thirty_most_recent() {
    let classifier = AnomalyClassifier::default();
    let mut history = AnomalyHistory::default();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for i in 0..31u64 {
        let qber = 0.01 * i as f64;
        let verdict = classifier.classify(qber, false);
        history.push(AnomalyRecord {
            date: start + chrono::Days::new(i),
            qber,
            is_anomaly: verdict.is_anomaly,
            confidence: verdict.confidence,
            affected_qubits: 0,
            protocol: Protocol::Bb84,
            severity: verdict.severity,
        });
    }

    assert_eq!(history.len(), 30);
    let records: Vec<_> = history.records().collect();
    assert_eq!(records[0].date, start + chrono::Days::new(30));
    assert_eq!(records[29].date, start + chrono::Days::new(1));
    assert!(records.windows(2).all(|w| w[0].date > w[1].date));
}

#[test]
fn no_eve_on_a_clean_channel() {
    let result = simulator(11)
        .detect(4, 60, false, EveStrategy::InterceptResend)
        .unwrap();
    assert_eq!(result.qber, 0.0);
    assert!(!result.eavesdropping_detected);
    assert_eq!(result.eve_strategy, None);
}

#[test]
fn intercept_resend_raises_qber() {
    let sim = simulator(12);
    let result = sim
        .detect(3, 150, true, EveStrategy::InterceptResend)
        .unwrap();

    assert!(result.qber > 0.15, "qber = {}", result.qber);
    assert!(result.eavesdropping_detected);
    assert_eq!(result.eve_strategy, Some(EveStrategy::InterceptResend));

    let timeline = sim.timeline();
    assert_eq!(timeline.anomalies.len(), 1);
    assert_eq!(timeline.total_anomalies, 1);
    assert_eq!(timeline.average_qber, result.qber);
}

#[test]
fn detection_inputs_are_validated() {
    let sim = simulator(13);
    assert!(sim.detect(0, 10, false, EveStrategy::Trojan).is_err());
    assert!(sim.detect(6, 10, false, EveStrategy::Trojan).is_err());
    assert!(sim.detect(2, 0, false, EveStrategy::Trojan).is_err());
    assert!(sim.timeline().anomalies.is_empty());
}

#[test]
fn timeline_serialises_records_flat() {
    let sim = simulator(14);
    sim.detect(2, 20, true, EveStrategy::Trojan).unwrap();

    let json = serde_json::to_value(sim.timeline()).unwrap();
    let record = &json["anomalies"][0];
    for field in [
        "date",
        "qber",
        "is_anomaly",
        "confidence",
        "affected_qubits",
        "protocol",
        "severity",
    ] {
        assert!(!record[field].is_null(), "missing {field}");
    }
    assert_eq!(record["protocol"], "BB84");
}
