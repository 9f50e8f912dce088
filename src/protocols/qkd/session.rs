use super::{Encoding, Protocol, ProtocolDriver, Setting};
use crate::model::{MeasurementModel, MeasurementRequest, Outcome};
use crate::statistics::{KeyStatistics, bits_to_string};
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

/// One measured trial of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Round {
    index: usize,
    alice_bit: Option<bool>,
    alice_setting: Setting,
    bob_setting: Option<Setting>,
    outcome: Outcome,
    key_bit: Option<bool>,
}

impl Round {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn alice_bit(&self) -> Option<bool> {
        self.alice_bit
    }

    pub fn alice_setting(&self) -> Setting {
        self.alice_setting
    }

    pub fn bob_setting(&self) -> Option<Setting> {
        self.bob_setting
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Classified key bit; `None` if the outcome could not be classified.
    pub fn key_bit(&self) -> Option<bool> {
        self.key_bit
    }

    /// `Some(true)` when both parties chose the same basis; `None` for angle protocols.
    pub fn bases_match(&self) -> Option<bool> {
        match (self.alice_setting, self.bob_setting) {
            (Setting::Basis(a), Some(Setting::Basis(b))) => Some(a == b),
            _ => None,
        }
    }

    /// Alice's angle and, for two-party settings, Bob's angle.
    pub fn angle_pair(&self) -> Option<(f64, Option<f64>)> {
        match (self.alice_setting, self.bob_setting) {
            (Setting::Angle(a), Some(Setting::Angle(b))) => Some((a, Some(b))),
            (Setting::Angle(a), None) => Some((a, None)),
            _ => None,
        }
    }
}

/// All rounds of one protocol run plus the sifted key.
///
/// Sifted indices are strictly increasing and point into `rounds`.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    protocol: Protocol,
    rounds: Vec<Round>,
    sifted_indices: Vec<usize>,
    sifted_key: Vec<bool>,
    reference_key: Option<Vec<bool>>,
}

impl Session {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Number of attempted rounds.
    pub fn raw_length(&self) -> usize {
        self.rounds.len()
    }

    pub fn sifted_indices(&self) -> &[usize] {
        &self.sifted_indices
    }

    /// Bob's side of the key.
    pub fn sifted_key(&self) -> &[bool] {
        &self.sifted_key
    }

    pub fn sifted_length(&self) -> usize {
        self.sifted_key.len()
    }

    /// Alice's prepared bits at the sifted indices (BB84 only).
    pub fn reference_key(&self) -> Option<&[bool]> {
        self.reference_key.as_deref()
    }

    /// Sifted key as a `'0'`/`'1'` string.
    pub fn key_string(&self) -> String {
        bits_to_string(&self.sifted_key)
    }

    pub fn statistics(&self) -> KeyStatistics {
        KeyStatistics::of(self)
    }
}

/// Round settings and batch seed of a session, drawn but not yet measured.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    encodings: Vec<Encoding>,
    batch_seed: u64,
}

impl SessionPlan {
    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }
}

/// Runs `n` rounds of `driver` against `model`.
///
/// All settings are drawn first, the rounds are measured as one batch, and
/// sifting only starts once every outcome is back. Exactly `n` rounds are
/// returned whatever happens to individual measurements.
pub fn run_session(
    driver: &dyn ProtocolDriver,
    model: &dyn MeasurementModel,
    n: usize,
    rng: &mut dyn RngCore,
) -> Session {
    measure_session(driver, model, plan_session(driver, n, rng))
}

/// Draws every random choice of an `n`-round session.
pub fn plan_session(driver: &dyn ProtocolDriver, n: usize, rng: &mut dyn RngCore) -> SessionPlan {
    let encodings = (0..n).map(|_| driver.encode_round(rng)).collect();
    SessionPlan {
        encodings,
        batch_seed: rng.next_u64(),
    }
}

/// Measures a planned session as one batch, then classifies and sifts it.
pub fn measure_session(
    driver: &dyn ProtocolDriver,
    model: &dyn MeasurementModel,
    plan: SessionPlan,
) -> Session {
    let protocol = driver.protocol();
    let SessionPlan {
        encodings,
        batch_seed,
    } = plan;
    let n = encodings.len();

    let requests: Vec<MeasurementRequest> = encodings.iter().map(|e| e.request).collect();
    let outcomes = model.measure_batch(&requests, batch_seed);

    let rounds: Vec<Round> = encodings
        .into_iter()
        .zip(outcomes)
        .enumerate()
        .map(|(index, (enc, outcome))| Round {
            index,
            alice_bit: enc.alice_bit,
            alice_setting: enc.alice_setting,
            bob_setting: enc.bob_setting,
            outcome,
            key_bit: driver.classify_outcome(outcome),
        })
        .collect();

    let unclassified = rounds.iter().filter(|r| r.key_bit.is_none()).count();
    if unclassified > 0 {
        debug!(%protocol, unclassified, "rounds skipped from the key");
    }

    let tracks_reference = driver.tracks_reference();
    let sifted: Vec<&Round> = rounds
        .iter()
        .filter(|r| r.key_bit.is_some())
        .filter(|r| !tracks_reference || r.alice_bit.is_some())
        .filter(|r| driver.sifting_rule(r))
        .collect();

    let sifted_indices = sifted.iter().map(|r| r.index).collect();
    let sifted_key = sifted.iter().filter_map(|r| r.key_bit).collect();
    let reference_key =
        tracks_reference.then(|| sifted.iter().filter_map(|r| r.alice_bit).collect());

    debug!(%protocol, rounds = n, sifted = sifted.len(), "session assembled");

    Session {
        protocol,
        rounds,
        sifted_indices,
        sifted_key,
        reference_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeasurementUnavailable;
    use crate::model::BornRuleModel;
    use crate::protocols::{bb84::Bb84, e91::E91, e92::E92, six_state::SixState};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Hands back single bits for every request, including two-qubit ones.
    struct SingleBitModel;

    impl MeasurementModel for SingleBitModel {
        fn try_measure_batch(
            &self,
            requests: &[MeasurementRequest],
            _seed: u64,
        ) -> Vec<Result<Outcome, MeasurementUnavailable>> {
            requests.iter().map(|_| Ok(Outcome::Bit(true))).collect()
        }
    }

    fn drivers() -> Vec<Box<dyn ProtocolDriver>> {
        vec![Box::new(Bb84), Box::new(E91), Box::new(E92), Box::new(SixState)]
    }

    #[test]
    fn every_driver_returns_n_rounds_with_valid_sifting() {
        let model = BornRuleModel::new();
        for driver in drivers() {
            for n in [0, 1, 7, 64] {
                let mut rng = ChaCha8Rng::seed_from_u64(n as u64);
                let session = run_session(driver.as_ref(), &model, n, &mut rng);

                assert_eq!(session.raw_length(), n);
                assert!(session.sifted_length() <= n);
                assert_eq!(session.sifted_indices().len(), session.sifted_length());
                assert!(session.sifted_indices().windows(2).all(|w| w[0] < w[1]));
                assert!(session.sifted_indices().iter().all(|&i| i < n));
                for (round, r) in session.rounds().iter().enumerate() {
                    assert_eq!(r.index(), round);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_session() {
        let model = BornRuleModel::new();
        for driver in drivers() {
            let a = run_session(driver.as_ref(), &model, 50, &mut ChaCha8Rng::seed_from_u64(9));
            let b = run_session(driver.as_ref(), &model, 50, &mut ChaCha8Rng::seed_from_u64(9));
            assert_eq!(a.rounds(), b.rounds());
            assert_eq!(a.sifted_key(), b.sifted_key());
        }
    }

    #[test]
    fn unclassifiable_outcomes_are_skipped_not_fatal() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let session = run_session(&E91, &SingleBitModel, 12, &mut rng);
        assert_eq!(session.raw_length(), 12);
        assert_eq!(session.sifted_length(), 0);
        assert!(session.rounds().iter().all(|r| r.key_bit().is_none()));
    }

    #[test]
    fn key_string_matches_bits() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let session = run_session(&E92, &BornRuleModel::new(), 10, &mut rng);
        let rendered: String = session
            .sifted_key()
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect();
        assert_eq!(session.key_string(), rendered);
    }
}
