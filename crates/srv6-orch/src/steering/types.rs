//! Steering data model.

use crate::policy::PolicyIndex;
use serde::{Deserialize, Serialize};
use sr_types::IpPrefix;
use std::fmt;

/// Traffic class a steering rule applies to. The numeric tags appear
/// in management output and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficType {
    L2,
    Ipv4,
    Ipv6,
}

impl TrafficType {
    pub const fn as_u8(self) -> u8 {
        match self {
            TrafficType::L2 => 2,
            TrafficType::Ipv4 => 4,
            TrafficType::Ipv6 => 6,
        }
    }
}

impl fmt::Display for TrafficType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficType::L2 => write!(f, "l2"),
            TrafficType::Ipv4 => write!(f, "ipv4"),
            TrafficType::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// Classification key of a steering rule: a routed prefix within a
/// table, or an attachment interface for L2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteeringKey {
    L3 { prefix: IpPrefix, fib_table: u32 },
    L2 { if_index: u32 },
}

impl SteeringKey {
    /// Traffic class implied by the key shape and address family.
    pub fn traffic_type(&self) -> TrafficType {
        match self {
            SteeringKey::L3 { prefix, .. } if prefix.is_ipv4() => TrafficType::Ipv4,
            SteeringKey::L3 { .. } => TrafficType::Ipv6,
            SteeringKey::L2 { .. } => TrafficType::L2,
        }
    }
}

impl fmt::Display for SteeringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SteeringKey::L3 { prefix, fib_table } => {
                write!(f, "l3:{}@table{}", prefix, fib_table)
            }
            SteeringKey::L2 { if_index } => write!(f, "l2:if{}", if_index),
        }
    }
}

/// One steering rule: a classification key mapped to a target policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringRule {
    pub key: SteeringKey,
    pub traffic_type: TrafficType,
    pub policy: PolicyIndex,
}
