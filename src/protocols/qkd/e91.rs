//! E91 Quantum Key Distribution Protocol.
//!
//! A source distributes Bell pairs; Alice and Bob each rotate their half by
//! an angle drawn from their own CHSH setting set and measure. Equal outcomes
//! (`00`/`11`) yield key bit 0, unequal outcomes yield key bit 1. No reference
//! key is kept.

use super::{Encoding, Protocol, ProtocolDriver, Round, Setting};
use crate::model::{MeasurementRequest, Outcome};
use rand::{Rng, RngCore};
use std::f64::consts::{FRAC_PI_4, FRAC_PI_8};

/// Alice's analyser angles (radians).
pub const ALICE_ANGLES: [f64; 2] = [0.0, FRAC_PI_4];
/// Bob's analyser angles (radians).
pub const BOB_ANGLES: [f64; 3] = [FRAC_PI_4, FRAC_PI_8, -FRAC_PI_8];

/// E91 driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct E91;

impl ProtocolDriver for E91 {
    fn protocol(&self) -> Protocol {
        Protocol::E91
    }

    fn encode_round(&self, rng: &mut dyn RngCore) -> Encoding {
        let alice_angle = ALICE_ANGLES[rng.random_range(0..ALICE_ANGLES.len())];
        let bob_angle = BOB_ANGLES[rng.random_range(0..BOB_ANGLES.len())];

        Encoding {
            alice_bit: None,
            alice_setting: Setting::Angle(alice_angle),
            bob_setting: Some(Setting::Angle(bob_angle)),
            request: MeasurementRequest::Entangled {
                alice_angle,
                bob_angle,
            },
        }
    }

    fn classify_outcome(&self, outcome: Outcome) -> Option<bool> {
        match outcome {
            Outcome::Pair { alice, bob } => Some(alice != bob),
            Outcome::Bit(_) => None,
        }
    }

    fn sifting_rule(&self, _round: &Round) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BornRuleModel, CircuitModel};
    use crate::protocols::run_session;
    use crate::sampler::Sampler;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parity_classification() {
        let cases = [
            (false, false, false),
            (true, true, false),
            (false, true, true),
            (true, false, true),
        ];
        for (alice, bob, key) in cases {
            assert_eq!(E91.classify_outcome(Outcome::Pair { alice, bob }), Some(key));
        }
        assert_eq!(E91.classify_outcome(Outcome::Bit(true)), None);
    }

    #[test]
    fn settings_come_from_the_chsh_sets() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let session = run_session(&E91, &BornRuleModel::new(), 100, &mut rng);
        for round in session.rounds() {
            let (a, b) = round.angle_pair().unwrap();
            assert!(ALICE_ANGLES.contains(&a));
            assert!(BOB_ANGLES.contains(&b.unwrap()));
            assert_eq!(round.bases_match(), None);
        }
        assert_eq!(session.sifted_length(), 100);
        assert!(session.reference_key().is_none());
    }

    #[test]
    fn equal_settings_give_zero_key_bits_on_circuits() {
        // Alice at pi/4 against Bob at pi/4 is perfectly correlated
        let mut rng = ChaCha8Rng::seed_from_u64(100);
        let session = run_session(&E91, &CircuitModel::new(Sampler::new()), 80, &mut rng);
        for round in session.rounds() {
            if round.angle_pair() == Some((FRAC_PI_4, Some(FRAC_PI_4))) {
                assert_eq!(round.key_bit(), Some(false));
            }
        }
    }
}
