//! Six-State Quantum Key Distribution Protocol.
//!
//! BB84 over three mutually unbiased bases: Alice sends one of the six
//! eigenstates of Z, X and Y and Bob measures in one of the three bases.
//! Bob's raw outcome of every round is the key bit; there is no basis
//! sifting and no reference key.

use super::{Encoding, Protocol, ProtocolDriver, Round, Setting};
use crate::model::{Basis, MeasurementRequest, Outcome};
use rand::{Rng, RngCore};

/// Six-State driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SixState;

impl ProtocolDriver for SixState {
    fn protocol(&self) -> Protocol {
        Protocol::SixState
    }

    fn encode_round(&self, rng: &mut dyn RngCore) -> Encoding {
        // One of the six (bit, basis) states
        let state = rng.random_range(0..6);
        let bit = state % 2 == 1;
        let alice_basis = Basis::ALL[state / 2];
        let bob_basis = Basis::ALL[rng.random_range(0..Basis::ALL.len())];

        Encoding {
            alice_bit: Some(bit),
            alice_setting: Setting::Basis(alice_basis),
            bob_setting: Some(Setting::Basis(bob_basis)),
            request: MeasurementRequest::Encoded {
                bit,
                basis: alice_basis,
                measured_in: bob_basis,
            },
        }
    }

    fn classify_outcome(&self, outcome: Outcome) -> Option<bool> {
        match outcome {
            Outcome::Bit(bit) => Some(bit),
            Outcome::Pair { .. } => None,
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
    fn all_six_states_are_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let session = run_session(&SixState, &BornRuleModel::new(), 300, &mut rng);

        for basis in Basis::ALL {
            for bit in [false, true] {
                assert!(session.rounds().iter().any(|r| {
                    r.alice_setting() == Setting::Basis(basis) && r.alice_bit() == Some(bit)
                }));
            }
        }
    }

    #[test]
    fn agreeing_bases_carry_alice_bit_on_circuits() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let session = run_session(&SixState, &CircuitModel::new(Sampler::new()), 90, &mut rng);

        assert!(session.reference_key().is_none());
        for round in session.rounds() {
            if round.bases_match() == Some(true) {
                assert_eq!(round.key_bit(), round.alice_bit());
            }
        }
    }

    #[test]
    fn every_round_contributes_a_key_bit() {
        for n in [0, 1, 7, 100] {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let session = run_session(&SixState, &BornRuleModel::new(), n, &mut rng);
            assert_eq!(session.raw_length(), n);
            assert_eq!(session.sifted_length(), n);
            assert_eq!(session.sifted_indices(), (0..n).collect::<Vec<_>>().as_slice());
        }
    }
}
