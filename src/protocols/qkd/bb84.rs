//! BB84 Quantum Key Distribution Protocol.
//!
//! Alice encodes a random bit in a random basis (rectilinear or diagonal),
//! Bob measures in a basis of his own choosing, and only rounds where the
//! two bases agree are kept. Alice's bits at those rounds form the reference
//! key against which Bob's key is checked for errors.

use super::{Encoding, Protocol, ProtocolDriver, Round, Session, Setting};
use crate::model::{Basis, MeasurementRequest, Outcome};
use rand::{Rng, RngCore};
use serde::Serialize;

/// BB84 driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bb84;

fn random_basis(rng: &mut dyn RngCore) -> Basis {
    Basis::CONJUGATE[rng.random_range(0..Basis::CONJUGATE.len())]
}

impl ProtocolDriver for Bb84 {
    fn protocol(&self) -> Protocol {
        Protocol::Bb84
    }

    fn encode_round(&self, rng: &mut dyn RngCore) -> Encoding {
        let bit = rng.random_bool(0.5);
        let alice_basis = random_basis(rng);
        let bob_basis = random_basis(rng);

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

    fn sifting_rule(&self, round: &Round) -> bool {
        round.bases_match() == Some(true)
    }

    fn tracks_reference(&self) -> bool {
        true
    }
}

/// Round-level view of a BB84 session, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bb84Details {
    /// Alice's bits at the sifted rounds.
    pub alice_key: Vec<u8>,
    /// Bob's measured bits at the sifted rounds.
    pub bob_key: Vec<u8>,
    /// Alice's basis per round (0 rectilinear, 1 diagonal).
    pub alice_bases: Vec<u8>,
    /// Bob's basis per round (0 rectilinear, 1 diagonal).
    pub bob_bases: Vec<u8>,
    pub sifted_indices: Vec<usize>,
    pub total_bits: usize,
    pub sifted_bits: usize,
}

impl Bb84Details {
    pub fn from_session(session: &Session) -> Self {
        let basis_code = |setting: Option<Setting>| match setting {
            Some(Setting::Basis(Basis::Diagonal)) => 1,
            _ => 0,
        };
        let as_bytes = |bits: &[bool]| bits.iter().map(|&b| u8::from(b)).collect::<Vec<_>>();

        Self {
            alice_key: as_bytes(session.reference_key().unwrap_or_default()),
            bob_key: as_bytes(session.sifted_key()),
            alice_bases: session
                .rounds()
                .iter()
                .map(|r| basis_code(Some(r.alice_setting())))
                .collect(),
            bob_bases: session
                .rounds()
                .iter()
                .map(|r| basis_code(r.bob_setting()))
                .collect(),
            sifted_indices: session.sifted_indices().to_vec(),
            total_bits: session.raw_length(),
            sifted_bits: session.sifted_length(),
        }
    }
}
