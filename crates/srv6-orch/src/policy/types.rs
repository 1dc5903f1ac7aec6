//! SR policy data model.

use crate::fwd::FwdHandleGuard;
use crate::sidlist::{RewriteContext, SidListIndex};
use serde::{Deserialize, Serialize};
use sr_types::Sid;

/// Stable index of a policy inside the policy table.
pub type PolicyIndex = u32;

/// Forwarding mode of a policy with multiple segment lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// Weighted load-balance among the member lists.
    Default,
    /// Replicate every packet to all member lists. Weights are
    /// accepted but ignored for this type.
    Spray,
}

/// How a caller names a policy in a mutation: by binding SID or by
/// table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRef {
    Bsid(Sid),
    Index(PolicyIndex),
}

/// Membership mutation applied to an existing policy.
#[derive(Debug, Clone)]
pub enum PolicyOp {
    AddSidList { segments: Vec<Sid>, weight: u32 },
    RemoveSidList { list: SidListIndex },
    ModifyWeight { list: SidListIndex, weight: u32 },
}

/// An SR policy keyed by its binding SID.
///
/// Member segment lists are referenced by store index in insertion
/// order; that order is the deterministic tie-break for equal-weight
/// lists. The three aggregate forwarding handles are re-derived from
/// current membership on every successful mutation.
#[derive(Debug)]
pub struct SrPolicy {
    pub bsid: Sid,
    pub policy_type: PolicyType,
    /// Encapsulate (true) vs. insert the SRH into the existing header.
    pub is_encap: bool,
    pub fib_table: u32,
    pub sid_lists: Vec<SidListIndex>,
    pub bsid_fwd: FwdHandleGuard,
    pub ip6_fwd: FwdHandleGuard,
    pub ip4_fwd: FwdHandleGuard,
}

impl SrPolicy {
    /// Aggregate forwarding handle guard for the given context.
    pub fn fwd(&self, context: RewriteContext) -> &FwdHandleGuard {
        match context {
            RewriteContext::Bsid => &self.bsid_fwd,
            RewriteContext::Ip6Encap => &self.ip6_fwd,
            RewriteContext::Ip4Encap => &self.ip4_fwd,
        }
    }
}
