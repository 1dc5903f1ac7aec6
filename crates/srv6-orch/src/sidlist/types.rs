//! Segment list data model.

use crate::fwd::FwdHandleGuard;
use serde::{Deserialize, Serialize};
use sr_types::Sid;
use std::sync::Arc;

/// Stable index of a segment list inside the store.
pub type SidListIndex = u32;

/// Default weight for weighted load-balancing among a policy's lists.
pub const SEGMENT_LIST_WEIGHT_DEFAULT: u32 = 1;

/// Usage context of a precomputed rewrite buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriteContext {
    /// SRH prepended behind the existing header of a packet already
    /// addressed to the binding SID.
    Bsid,
    /// Full outer IPv6 header plus SRH carrying an IPv6 payload.
    Ip6Encap,
    /// Full outer IPv6 header plus SRH carrying an IPv4 payload.
    Ip4Encap,
}

/// A segment list: an ordered, non-empty sequence of SIDs together
/// with its weight, precomputed rewrite buffers and the forwarding
/// handles for the three usage contexts.
///
/// Buffers are shared snapshots: a segment change builds new buffers
/// and swaps the `Arc`s, so a forwarding reader holding a previous
/// buffer keeps a self-consistent view.
#[derive(Debug)]
pub struct SegmentList {
    /// Segments in traversal order (first segment to visit first).
    pub segments: Vec<Sid>,
    pub weight: u32,
    pub rewrite_bsid: Arc<[u8]>,
    pub rewrite_ip6: Arc<[u8]>,
    pub rewrite_ip4: Arc<[u8]>,
    pub bsid_fwd: FwdHandleGuard,
    pub ip6_fwd: FwdHandleGuard,
    pub ip4_fwd: FwdHandleGuard,
}

impl SegmentList {
    /// Rewrite buffer snapshot for the given context.
    pub fn rewrite(&self, context: RewriteContext) -> Arc<[u8]> {
        match context {
            RewriteContext::Bsid => Arc::clone(&self.rewrite_bsid),
            RewriteContext::Ip6Encap => Arc::clone(&self.rewrite_ip6),
            RewriteContext::Ip4Encap => Arc::clone(&self.rewrite_ip4),
        }
    }

    /// Forwarding handle guard for the given context.
    pub fn fwd(&self, context: RewriteContext) -> &FwdHandleGuard {
        match context {
            RewriteContext::Bsid => &self.bsid_fwd,
            RewriteContext::Ip6Encap => &self.ip6_fwd,
            RewriteContext::Ip4Encap => &self.ip4_fwd,
        }
    }
}
