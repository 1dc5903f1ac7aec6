//! SRH rewrite-buffer precomputation.
//!
//! Three buffer shapes are produced per segment list:
//!
//! - the bare SRH used when a packet already addressed to the binding
//!   SID gets the header inserted behind its existing IPv6 header,
//! - a full IPv6 encapsulation template (outer header + SRH) for IPv6
//!   payloads, and
//! - the same template with the SRH carrying an IPv4 payload.
//!
//! Per RFC 8754 the segment list is stored in reverse traversal order:
//! the last segment to visit occupies entry 0 and the first segment to
//! visit occupies the last entry, with `segments_left` starting at
//! `n - 1`. Payload-length, source-address and (for the bare SRH) the
//! next-header fields are placeholders filled in per packet by the
//! consuming forwarding node.

use crate::error::SrError;
use sr_types::Sid;

pub const IPV6_HEADER_LEN: usize = 40;
pub const IPV6_DEFAULT_HOP_LIMIT: u8 = 64;

pub const IP_PROTO_IPIP: u8 = 4;
pub const IP_PROTO_IPV6: u8 = 41;
pub const IP_PROTO_ROUTING: u8 = 43;

/// Routing type value of the segment routing header.
pub const SRH_ROUTING_TYPE: u8 = 4;
pub const SRH_FIXED_LEN: usize = 8;

/// Largest segment count an SRH can carry: the 8-bit extension-length
/// field counts 8-octet units, two per segment.
pub const SRH_MAX_SEGMENTS: usize = 127;

/// Total SRH length in bytes for `n` segments.
pub fn srh_len(segment_count: usize) -> usize {
    SRH_FIXED_LEN + 16 * segment_count
}

/// Builds the bare SRH for insertion behind an existing IPv6 header.
///
/// `next_header` is 0 for the binding-SID form (placeholder, patched
/// per packet) or the payload protocol for encapsulation forms.
/// `segments` is given in traversal order; callers validate the count
/// against 1..=[`SRH_MAX_SEGMENTS`] before building.
pub fn encode_srh(segments: &[Sid], next_header: u8) -> Vec<u8> {
    debug_assert!(!segments.is_empty());
    debug_assert!(segments.len() <= SRH_MAX_SEGMENTS);
    let n = segments.len();
    let mut buf = Vec::with_capacity(srh_len(n));

    buf.push(next_header);
    // Length in 8-octet units, not counting the first 8 octets.
    buf.push((2 * n) as u8);
    buf.push(SRH_ROUTING_TYPE);
    buf.push((n - 1) as u8); // segments_left
    buf.push((n - 1) as u8); // last_entry
    buf.push(0); // flags
    buf.extend_from_slice(&[0, 0]); // tag

    // Entry 0 is the final segment; the first segment to visit is last.
    for sid in segments.iter().rev() {
        buf.extend_from_slice(&sid.octets());
    }

    buf
}

/// Builds the full encapsulation template: outer IPv6 header followed
/// by the SRH. The outer destination is the first segment to visit;
/// payload length and source address are placeholders.
pub fn encode_encap(segments: &[Sid], payload_proto: u8) -> Vec<u8> {
    debug_assert!(!segments.is_empty());
    let mut buf = Vec::with_capacity(IPV6_HEADER_LEN + srh_len(segments.len()));

    buf.extend_from_slice(&[0x60, 0, 0, 0]); // version 6, tc/flow zero
    buf.extend_from_slice(&[0, 0]); // payload length placeholder
    buf.push(IP_PROTO_ROUTING);
    buf.push(IPV6_DEFAULT_HOP_LIMIT);
    buf.extend_from_slice(&[0u8; 16]); // source placeholder
    buf.extend_from_slice(&segments[0].octets()); // dst = first segment

    buf.extend_from_slice(&encode_srh(segments, payload_proto));
    buf
}

/// Decodes an SRH buffer back to its segments in traversal order plus
/// the `segments_left` value.
///
/// Rejects buffers whose length disagrees with their own
/// `last_entry`/extension-length fields, so forwarding can trust any
/// buffer this returns Ok for.
pub fn decode_srh(buf: &[u8]) -> Result<(Vec<Sid>, u8), SrError> {
    if buf.len() < SRH_FIXED_LEN {
        return Err(SrError::MalformedRewrite(format!(
            "buffer too short: {} bytes",
            buf.len()
        )));
    }
    if buf[2] != SRH_ROUTING_TYPE {
        return Err(SrError::MalformedRewrite(format!(
            "unexpected routing type {}",
            buf[2]
        )));
    }

    let ext_len = buf[1] as usize;
    let segments_left = buf[3];
    let last_entry = buf[4] as usize;
    let n = last_entry + 1;

    if ext_len != 2 * n || buf.len() != srh_len(n) {
        return Err(SrError::MalformedRewrite(format!(
            "length fields disagree: ext_len={} last_entry={} bytes={}",
            ext_len,
            last_entry,
            buf.len()
        )));
    }
    if usize::from(segments_left) >= n {
        return Err(SrError::MalformedRewrite(format!(
            "segments_left {} out of range for {} segments",
            segments_left, n
        )));
    }

    let mut segments = Vec::with_capacity(n);
    // Stored last-visited-first; reverse back to traversal order.
    for i in (0..n).rev() {
        let offset = SRH_FIXED_LEN + 16 * i;
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&buf[offset..offset + 16]);
        segments.push(Sid::from_octets(octets));
    }

    Ok((segments, segments_left))
}
