//! Traffic steering into SR policies.

mod orch;
mod types;

pub use orch::{SteeringOrch, SteeringOrchStats};
pub use types::{SteeringKey, SteeringRule, TrafficType};
