//! LocalSID table and behavior registry.

mod behavior;
mod orch;
mod types;

pub use behavior::{BehaviorRegistry, SrBehavior};
pub use orch::{LocalSidOrch, LocalSidOrchStats};
pub use types::{
    BehaviorCode, BehaviorParams, LocalSid, SR_BEHAVIOR_END, SR_BEHAVIOR_END_DT4,
    SR_BEHAVIOR_END_DT6, SR_BEHAVIOR_END_DX2, SR_BEHAVIOR_END_DX4, SR_BEHAVIOR_END_DX6,
    SR_BEHAVIOR_END_T, SR_BEHAVIOR_END_X, SR_PLUGIN_CODE_BASE,
};
