//! Quantum Key Distribution protocols.
//!
//! Every protocol is a [`ProtocolDriver`](qkd::ProtocolDriver) plugged into
//! the same round loop, [`run_session`](qkd::run_session).

pub mod qkd;
pub use qkd::{
    Encoding, Protocol, ProtocolDriver, Round, Session, SessionPlan, Setting, bb84, e91, e92,
    measure_session, plan_session, run_session, six_state,
};
