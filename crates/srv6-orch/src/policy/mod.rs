//! SR policy table.

mod orch;
mod types;

pub use orch::{PolicyOrch, PolicyOrchStats};
pub use types::{PolicyIndex, PolicyOp, PolicyRef, PolicyType, SrPolicy};
