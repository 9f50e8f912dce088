//! E92 Quantum Key Distribution Protocol.
//!
//! A single setting per round: |+> is rotated by `Ry(2θ)` with θ drawn from
//! {0, π/4, π/2} and measured. The raw outcome is the key bit and every round
//! is kept.

use super::{Encoding, Protocol, ProtocolDriver, Round, Setting};
use crate::model::{MeasurementRequest, Outcome};
use rand::{Rng, RngCore};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Rotation angles (radians).
pub const ANGLES: [f64; 3] = [0.0, FRAC_PI_4, FRAC_PI_2];

/// E92 driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct E92;

impl ProtocolDriver for E92 {
    fn protocol(&self) -> Protocol {
        Protocol::E92
    }

    fn encode_round(&self, rng: &mut dyn RngCore) -> Encoding {
        let angle = ANGLES[rng.random_range(0..ANGLES.len())];

        Encoding {
            alice_bit: None,
            alice_setting: Setting::Angle(angle),
            bob_setting: None,
            request: MeasurementRequest::Rotated { angle },
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
