//! Opaque forwarding-handle types.

use crate::sidlist::RewriteContext;
use serde::{Deserialize, Serialize};
use sr_types::IpAddress;
use std::fmt;

/// Type tag of a forwarding handle.
///
/// The engine never interprets a tag beyond equality; the set of
/// well-known tags below covers the built-in acquisition requests, and
/// externally registered behaviors may carry tags at or above
/// [`FwdType::FIRST_EXTERNAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FwdType(pub u16);

impl FwdType {
    pub const DROP: FwdType = FwdType(0);
    /// Segment-list rewrite (SRH imposition or insertion)
    pub const SR_REWRITE: FwdType = FwdType(1);
    /// Weighted load-balance over child handles
    pub const LOAD_BALANCE: FwdType = FwdType(2);
    /// Replicate to every child handle
    pub const REPLICATE: FwdType = FwdType(3);
    /// Transmit on an interface towards a next hop
    pub const INTERFACE_TX: FwdType = FwdType(4);
    /// Continue with a lookup in a routing table
    pub const TABLE_LOOKUP: FwdType = FwdType(5);
    /// Generic SR endpoint processing
    pub const SR_LOCALSID: FwdType = FwdType(6);

    /// First tag value available to externally registered behaviors.
    pub const FIRST_EXTERNAL: FwdType = FwdType(0x100);
}

impl fmt::Display for FwdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fwd-type:{}", self.0)
    }
}

/// An opaque, reference-counted forwarding capability.
///
/// The index is meaningful only to the provider that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FwdHandle {
    pub fwd_type: FwdType,
    pub index: u32,
}

impl fmt::Display for FwdHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.fwd_type.0, self.index)
    }
}

/// Parameters for acquiring a forwarding handle from the provider.
#[derive(Debug, Clone)]
pub enum FwdRequest {
    /// Rewrite a packet with a segment list's precomputed buffer.
    SidListRewrite {
        list: u32,
        context: RewriteContext,
    },
    /// Load-balance over the given buckets; bucket multiplicity
    /// encodes the weighting.
    LoadBalance { buckets: Vec<FwdHandle> },
    /// Replicate to every branch.
    Replicate { branches: Vec<FwdHandle> },
    /// Cross-connect out of an interface towards a next hop.
    InterfaceTx {
        if_index: u32,
        next_hop: IpAddress,
    },
    /// Continue with a lookup in the given routing table.
    TableLookup { table_id: u32 },
    /// Endpoint processing for a LocalSID behavior.
    Endpoint { behavior: u16 },
}
