//! LocalSID data model.

use crate::fwd::FwdHandleGuard;
use serde::{Deserialize, Serialize};
use sr_types::{IpAddress, Sid, VlanId};
use std::any::Any;
use std::fmt;

/// Numeric tag of a registered behavior.
pub type BehaviorCode = u16;

pub const SR_BEHAVIOR_END: BehaviorCode = 1;
pub const SR_BEHAVIOR_END_X: BehaviorCode = 2;
pub const SR_BEHAVIOR_END_T: BehaviorCode = 3;
pub const SR_BEHAVIOR_END_DX2: BehaviorCode = 4;
pub const SR_BEHAVIOR_END_DX6: BehaviorCode = 5;
pub const SR_BEHAVIOR_END_DX4: BehaviorCode = 6;
pub const SR_BEHAVIOR_END_DT6: BehaviorCode = 7;
pub const SR_BEHAVIOR_END_DT4: BehaviorCode = 8;

/// First code available to externally registered behaviors. Codes
/// below are reserved for the built-ins.
pub const SR_PLUGIN_CODE_BASE: BehaviorCode = 9;

/// Behavior-specific parameters, tagged by category so a table id can
/// never be read as an interface index or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorParams {
    /// No parameters (plain endpoint).
    None,
    /// Cross-connect out of an interface towards a next hop; the VLAN
    /// tag applies to L2 cross-connect only.
    CrossConnect {
        if_index: u32,
        next_hop: IpAddress,
        vlan: Option<VlanId>,
    },
    /// Continue with a lookup in a routing table.
    TableLookup { table_id: u32 },
}

/// One endpoint entry: an address this node terminates, bound to a
/// behavior and its parameters.
///
/// `plugin_mem` is owned by the behavior: written by its creation hook,
/// released by its removal hook. The engine never inspects it.
pub struct LocalSid {
    pub address: Sid,
    pub behavior: BehaviorCode,
    pub params: BehaviorParams,
    /// Penultimate segment pop of the routing header.
    pub end_psp: bool,
    /// Routing table the address is registered in.
    pub fib_table: u32,
    /// Position of this entry's valid/invalid counter pair.
    pub counter_slot: usize,
    pub fwd: FwdHandleGuard,
    pub plugin_mem: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for LocalSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSid")
            .field("address", &self.address)
            .field("behavior", &self.behavior)
            .field("params", &self.params)
            .field("end_psp", &self.end_psp)
            .field("fib_table", &self.fib_table)
            .field("counter_slot", &self.counter_slot)
            .field("fwd", &self.fwd)
            .field("plugin_mem", &self.plugin_mem.is_some())
            .finish()
    }
}
