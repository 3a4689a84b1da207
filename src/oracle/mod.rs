//! Verifiable randomness
//!
//! A schnorrkel-backed oracle and the task that feeds its output back into
//! an engine.

pub mod driver;
pub mod vrf_engine;

pub use driver::{Delivery, FulfillmentDriver};
pub use vrf_engine::{VrfError, VrfFulfillment, VrfProof, VrfRandomnessOracle};
