//! Segment identifier type.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// A 128-bit segment identifier.
///
/// A SID is syntactically an IPv6 address. It names one hop in a
/// segment list, a policy's binding SID, or a LocalSID terminated by
/// this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(Ipv6Addr);

impl Sid {
    pub const UNSPECIFIED: Self = Sid(Ipv6Addr::UNSPECIFIED);

    pub const fn new(addr: Ipv6Addr) -> Self {
        Sid(addr)
    }

    pub const fn inner(&self) -> Ipv6Addr {
        self.0
    }

    pub const fn octets(&self) -> [u8; 16] {
        self.0.octets()
    }

    pub const fn from_octets(octets: [u8; 16]) -> Self {
        Sid(Ipv6Addr::new(
            u16::from_be_bytes([octets[0], octets[1]]),
            u16::from_be_bytes([octets[2], octets[3]]),
            u16::from_be_bytes([octets[4], octets[5]]),
            u16::from_be_bytes([octets[6], octets[7]]),
            u16::from_be_bytes([octets[8], octets[9]]),
            u16::from_be_bytes([octets[10], octets[11]]),
            u16::from_be_bytes([octets[12], octets[13]]),
            u16::from_be_bytes([octets[14], octets[15]]),
        ))
    }

    pub fn is_unspecified(&self) -> bool {
        self.0.is_unspecified()
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Sid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv6Addr>()
            .map(Sid)
            .map_err(|_| ParseError::InvalidSid(s.to_string()))
    }
}

impl From<Ipv6Addr> for Sid {
    fn from(addr: Ipv6Addr) -> Self {
        Sid(addr)
    }
}

impl From<Sid> for Ipv6Addr {
    fn from(sid: Sid) -> Self {
        sid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sid_parse() {
        let sid: Sid = "2001:db8::1".parse().unwrap();
        assert_eq!(sid.to_string(), "2001:db8::1");
    }

    #[test]
    fn test_sid_parse_rejects_ipv4() {
        assert!("10.0.0.1".parse::<Sid>().is_err());
        assert!("not-an-address".parse::<Sid>().is_err());
    }

    #[test]
    fn test_sid_octets_round_trip() {
        let sid: Sid = "fc00:0:1:2::a".parse().unwrap();
        assert_eq!(Sid::from_octets(sid.octets()), sid);
    }

    #[test]
    fn test_unspecified() {
        assert!(Sid::UNSPECIFIED.is_unspecified());
        let sid: Sid = "::1".parse().unwrap();
        assert!(!sid.is_unspecified());
    }
}
