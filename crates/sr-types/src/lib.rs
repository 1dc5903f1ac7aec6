//! Common value types for the SRv6 control plane.
//!
//! This crate provides type-safe representations of the network
//! primitives shared by the segment-routing state engine:
//!
//! - [`Sid`]: 128-bit segment identifiers (IPv6 addresses)
//! - [`IpAddress`]: IPv4 and IPv6 addresses
//! - [`IpPrefix`]: IP network prefixes (CIDR notation) with containment checks
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers

mod ip;
mod sid;
mod vlan;

pub use ip::{IpAddress, IpPrefix};
pub use sid::Sid;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid SID format: {0}")]
    InvalidSid(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),
}
