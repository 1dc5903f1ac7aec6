//! VLAN ID type with validation.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// VLAN 0 and VLAN 4095 are reserved by the standard and rejected.
/// Used by L2 cross-connect endpoints to select a tagged sub-interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    /// Creates a new VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the VLAN ID is not in the valid range (1-4094).
    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u16 = s.parse().map_err(|_| ParseError::InvalidVlanId(0))?;
        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_vlan_ids() {
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(300).is_ok());
        assert!(VlanId::new(4094).is_ok());
    }

    #[test]
    fn test_reserved_vlan_ids() {
        assert!(VlanId::new(0).is_err());
        assert!(VlanId::new(4095).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let vlan: VlanId = "300".parse().unwrap();
        assert_eq!(vlan.as_u16(), 300);
        assert_eq!(vlan.to_string(), "300");
    }
}
