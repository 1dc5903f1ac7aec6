//! Segment list store and rewrite precomputation.

mod rewrite;
mod store;
mod types;

pub use rewrite::{
    decode_srh, encode_encap, encode_srh, srh_len, IPV6_DEFAULT_HOP_LIMIT, IPV6_HEADER_LEN,
    IP_PROTO_IPIP, IP_PROTO_IPV6, IP_PROTO_ROUTING, SRH_FIXED_LEN, SRH_MAX_SEGMENTS,
    SRH_ROUTING_TYPE,
};
pub use store::SidListStore;
pub use types::{RewriteContext, SegmentList, SidListIndex, SEGMENT_LIST_WEIGHT_DEFAULT};
