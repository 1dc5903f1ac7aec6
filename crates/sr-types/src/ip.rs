//! IP address and prefix types with safe parsing and containment checks.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP address that can be either IPv4 or IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl IpAddress {
    pub const fn is_ipv4(&self) -> bool {
        matches!(self, IpAddress::V4(_))
    }

    pub const fn is_ipv6(&self) -> bool {
        matches!(self, IpAddress::V6(_))
    }

    pub const fn as_ipv4(&self) -> Option<&Ipv4Addr> {
        match self {
            IpAddress::V4(addr) => Some(addr),
            IpAddress::V6(_) => None,
        }
    }

    pub const fn as_ipv6(&self) -> Option<&Ipv6Addr> {
        match self {
            IpAddress::V4(_) => None,
            IpAddress::V6(addr) => Some(addr),
        }
    }

    pub fn is_unspecified(&self) -> bool {
        match self {
            IpAddress::V4(addr) => addr.is_unspecified(),
            IpAddress::V6(addr) => addr.is_unspecified(),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpAddress::V4(addr) => addr.fmt(f),
            IpAddress::V6(addr) => addr.fmt(f),
        }
    }
}

impl FromStr for IpAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            s.parse::<Ipv6Addr>()
                .map(IpAddress::V6)
                .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
        } else {
            s.parse::<Ipv4Addr>()
                .map(IpAddress::V4)
                .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
        }
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        IpAddress::V4(addr)
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        IpAddress::V6(addr)
    }
}

/// An IP prefix in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
///
/// The stored address is always the network address: host bits beyond
/// the prefix length are zeroed on construction, so two spellings of
/// the same prefix compare and hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpPrefix {
    address: IpAddress,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a new IP prefix, masking out host bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length is invalid for the
    /// address family (>32 for IPv4, >128 for IPv6).
    pub fn new(address: IpAddress, prefix_len: u8) -> Result<Self, ParseError> {
        let max_len = match address {
            IpAddress::V4(_) => 32,
            IpAddress::V6(_) => 128,
        };

        if prefix_len > max_len {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum {} for address family",
                prefix_len, max_len
            )));
        }

        let network = match address {
            IpAddress::V4(addr) => {
                let bits = u32::from(addr) & mask_v4(prefix_len);
                IpAddress::V4(Ipv4Addr::from(bits))
            }
            IpAddress::V6(addr) => {
                let bits = u128::from(addr) & mask_v6(prefix_len);
                IpAddress::V6(Ipv6Addr::from(bits))
            }
        };

        Ok(IpPrefix {
            address: network,
            prefix_len,
        })
    }

    pub const fn address(&self) -> &IpAddress {
        &self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv4(&self) -> bool {
        self.address.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.address.is_ipv6()
    }

    /// Returns true if `addr` falls inside this prefix.
    ///
    /// An address of a different family is never contained.
    pub fn contains(&self, addr: &IpAddress) -> bool {
        match (&self.address, addr) {
            (IpAddress::V4(net), IpAddress::V4(addr)) => {
                u32::from(*addr) & mask_v4(self.prefix_len) == u32::from(*net)
            }
            (IpAddress::V6(net), IpAddress::V6(addr)) => {
                u128::from(*addr) & mask_v6(self.prefix_len) == u128::from(*net)
            }
            _ => false,
        }
    }
}

fn mask_v4(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}

fn mask_v6(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len))
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let address: IpAddress = addr_str.parse()?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        IpPrefix::new(address, prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ip_address_discrimination() {
        let v4: IpAddress = "10.0.0.1".parse().unwrap();
        assert!(v4.is_ipv4());
        assert!(!v4.is_ipv6());

        let v6: IpAddress = "::1".parse().unwrap();
        assert!(v6.is_ipv6());
        assert!(!v6.is_ipv4());
    }

    #[test]
    fn test_prefix_parse() {
        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert!(prefix.is_ipv4());
        assert_eq!(prefix.prefix_len(), 24);

        let v6_prefix: IpPrefix = "2001:db8::/32".parse().unwrap();
        assert!(v6_prefix.is_ipv6());
        assert_eq!(v6_prefix.prefix_len(), 32);
    }

    #[test]
    fn test_prefix_canonicalization() {
        let a: IpPrefix = "2001:db8::1/32".parse().unwrap();
        let b: IpPrefix = "2001:db8::/32".parse().unwrap();
        assert_eq!(a, b);

        let c: IpPrefix = "10.1.2.3/16".parse().unwrap();
        assert_eq!(c.to_string(), "10.1.0.0/16");
    }

    #[test]
    fn test_prefix_contains() {
        let prefix: IpPrefix = "2001:db8::/32".parse().unwrap();
        assert!(prefix.contains(&"2001:db8:1::1".parse().unwrap()));
        assert!(!prefix.contains(&"2001:db9::1".parse().unwrap()));
        // Different family never matches.
        assert!(!prefix.contains(&"10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_default_route_contains_everything() {
        let v4_default: IpPrefix = "0.0.0.0/0".parse().unwrap();
        assert!(v4_default.contains(&"192.168.1.1".parse().unwrap()));

        let v6_default: IpPrefix = "::/0".parse().unwrap();
        assert!(v6_default.contains(&"2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_invalid_prefix_length() {
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("2001:db8::/129".parse::<IpPrefix>().is_err());
    }

    #[test]
    fn test_host_prefix_contains_only_itself() {
        let host: IpPrefix = "10.0.0.1/32".parse().unwrap();
        assert!(host.contains(&"10.0.0.1".parse().unwrap()));
        assert!(!host.contains(&"10.0.0.2".parse().unwrap()));
    }
}
