//! Quantum Key Distribution (QKD) Protocols.
//!
//! This module contains the four supported protocols:
//! - **BB84**: conjugate-basis encoding with basis sifting.
//! - **E91**: entanglement-based, keys from the parity of Bell-pair outcomes.
//! - **E92**: single-setting angle-rotation variant, no sifting.
//! - **Six-State**: BB84 extended to three mutually unbiased bases.

pub mod bb84;
pub mod e91;
pub mod e92;
mod session;
pub mod six_state;

pub use session::{Round, Session, SessionPlan, measure_session, plan_session, run_session};

use crate::error::SimulationError;
use crate::model::{Basis, MeasurementRequest, Outcome};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "BB84")]
    Bb84,
    #[serde(rename = "E91")]
    E91,
    #[serde(rename = "E92")]
    E92,
    #[serde(rename = "Six-State")]
    SixState,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Bb84,
        Protocol::E91,
        Protocol::E92,
        Protocol::SixState,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Protocol::Bb84 => "BB84",
            Protocol::E91 => "E91",
            Protocol::E92 => "E92",
            Protocol::SixState => "Six-State",
        }
    }

    /// Driver implementing this protocol.
    pub fn driver(self) -> Box<dyn ProtocolDriver> {
        match self {
            Protocol::Bb84 => Box::new(bb84::Bb84),
            Protocol::E91 => Box::new(e91::E91),
            Protocol::E92 => Box::new(e92::E92),
            Protocol::SixState => Box::new(six_state::SixState),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "bb84" => Ok(Protocol::Bb84),
            "e91" => Ok(Protocol::E91),
            "e92" => Ok(Protocol::E92),
            "sixstate" => Ok(Protocol::SixState),
            _ => Err(SimulationError::UnknownProtocol(s.to_string())),
        }
    }
}

/// A party's setting for one round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Basis(Basis),
    /// Rotation angle in radians.
    Angle(f64),
}

/// Everything a driver decides before a round is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encoding {
    /// Bit Alice prepared, for protocols where she prepares one.
    pub alice_bit: Option<bool>,
    pub alice_setting: Setting,
    /// `None` for single-setting protocols.
    pub bob_setting: Option<Setting>,
    pub request: MeasurementRequest,
}

/// Protocol-specific strategy plugged into [`run_session`].
pub trait ProtocolDriver: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Draws the settings of one round from `rng`.
    fn encode_round(&self, rng: &mut dyn RngCore) -> Encoding;

    /// Key bit carried by `outcome`; `None` when the outcome does not fit
    /// this protocol, in which case the round contributes nothing.
    fn classify_outcome(&self, outcome: Outcome) -> Option<bool>;

    /// Whether a classified round is kept in the key.
    fn sifting_rule(&self, round: &Round) -> bool;

    /// Whether Alice's prepared bits are kept as a reference key for QBER.
    fn tracks_reference(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_names_round_trip_through_from_str() {
        for p in Protocol::ALL {
            assert_eq!(p.name().parse::<Protocol>().unwrap(), p);
            assert_eq!(p.driver().protocol(), p);
        }
        assert_eq!("six_state".parse::<Protocol>().unwrap(), Protocol::SixState);
        assert!("b92".parse::<Protocol>().is_err());
    }

    #[test]
    fn protocols_serialize_with_display_names() {
        let json = serde_json::to_string(&Protocol::ALL).unwrap();
        assert_eq!(json, r#"["BB84","E91","E92","Six-State"]"#);
    }
}
