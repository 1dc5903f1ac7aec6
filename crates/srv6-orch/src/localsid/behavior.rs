//! Behavior registry and built-in endpoint behaviors.
//!
//! A behavior bundles the forwarding-handle type, the management
//! representation (format/parse) and the optional lifecycle hooks for
//! one endpoint flavor. Built-ins occupy the reserved code range;
//! extensions register at [`SR_PLUGIN_CODE_BASE`] and above.

use super::types::{
    BehaviorCode, BehaviorParams, LocalSid, SR_BEHAVIOR_END, SR_BEHAVIOR_END_DT4,
    SR_BEHAVIOR_END_DT6, SR_BEHAVIOR_END_DX2, SR_BEHAVIOR_END_DX4, SR_BEHAVIOR_END_DX6,
    SR_BEHAVIOR_END_T, SR_BEHAVIOR_END_X, SR_PLUGIN_CODE_BASE,
};
use crate::error::SrError;
use crate::fwd::FwdType;
use sr_types::{IpAddress, VlanId};
use std::collections::HashMap;
use std::sync::Arc;

/// Endpoint behavior contract.
///
/// `parse` turns a management-surface parameter string into typed
/// parameters; `format` is its inverse for display. The lifecycle
/// hooks receive a mutable view of the entry and may populate or
/// release its `plugin_mem`.
pub trait SrBehavior: Send + Sync {
    fn name(&self) -> &str;

    /// Forwarding-handle type acquired for entries of this behavior.
    fn fwd_type(&self) -> FwdType;

    fn format(&self, entry: &LocalSid) -> String;

    fn parse(&self, input: &str) -> Result<BehaviorParams, SrError>;

    fn validate(&self, params: &BehaviorParams) -> Result<(), SrError>;

    /// Called with the fully built entry before it becomes visible to
    /// lookups. A failure discards the entry.
    fn on_create(&self, _entry: &mut LocalSid) -> Result<(), String> {
        Ok(())
    }

    /// Called before the entry is detached. A failure is surfaced as a
    /// warning and does not block the removal.
    fn on_remove(&self, _entry: &mut LocalSid) -> Result<(), String> {
        Ok(())
    }
}

/// Registry of behaviors keyed by numeric code, with a name index.
pub struct BehaviorRegistry {
    by_code: HashMap<BehaviorCode, Arc<dyn SrBehavior>>,
    by_name: HashMap<String, BehaviorCode>,
}

impl BehaviorRegistry {
    /// Registry populated with the built-in endpoint behaviors.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            by_code: HashMap::new(),
            by_name: HashMap::new(),
        };
        let builtins: [(BehaviorCode, Arc<dyn SrBehavior>); 8] = [
            (SR_BEHAVIOR_END, Arc::new(EndBehavior)),
            (
                SR_BEHAVIOR_END_X,
                Arc::new(XConnectBehavior {
                    name: "End.X",
                    l2: false,
                }),
            ),
            (
                SR_BEHAVIOR_END_T,
                Arc::new(TableBehavior { name: "End.T" }),
            ),
            (
                SR_BEHAVIOR_END_DX2,
                Arc::new(XConnectBehavior {
                    name: "End.DX2",
                    l2: true,
                }),
            ),
            (
                SR_BEHAVIOR_END_DX6,
                Arc::new(XConnectBehavior {
                    name: "End.DX6",
                    l2: false,
                }),
            ),
            (
                SR_BEHAVIOR_END_DX4,
                Arc::new(XConnectBehavior {
                    name: "End.DX4",
                    l2: false,
                }),
            ),
            (
                SR_BEHAVIOR_END_DT6,
                Arc::new(TableBehavior { name: "End.DT6" }),
            ),
            (
                SR_BEHAVIOR_END_DT4,
                Arc::new(TableBehavior { name: "End.DT4" }),
            ),
        ];
        for (code, behavior) in builtins {
            // Built-in names and codes are distinct by construction.
            let _ = registry.insert(code, behavior);
        }
        registry
    }

    /// Registers an external behavior. The code must be outside the
    /// reserved built-in range, and both name and code must be unused.
    pub fn register(
        &mut self,
        code: BehaviorCode,
        behavior: Arc<dyn SrBehavior>,
    ) -> Result<(), SrError> {
        if code < SR_PLUGIN_CODE_BASE {
            return Err(SrError::ReservedBehaviorCode(code));
        }
        self.insert(code, behavior)
    }

    fn insert(&mut self, code: BehaviorCode, behavior: Arc<dyn SrBehavior>) -> Result<(), SrError> {
        if self.by_code.contains_key(&code) {
            return Err(SrError::DuplicateBehaviorCode(code));
        }
        let name = behavior.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(SrError::DuplicateBehaviorName(name));
        }
        self.by_name.insert(name, code);
        self.by_code.insert(code, behavior);
        Ok(())
    }

    pub fn get(&self, code: BehaviorCode) -> Option<&Arc<dyn SrBehavior>> {
        self.by_code.get(&code)
    }

    pub fn code_by_name(&self, name: &str) -> Option<BehaviorCode> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// End: continue segment processing at this node.
struct EndBehavior;

impl SrBehavior for EndBehavior {
    fn name(&self) -> &str {
        "End"
    }

    fn fwd_type(&self) -> FwdType {
        FwdType::SR_LOCALSID
    }

    fn format(&self, _entry: &LocalSid) -> String {
        String::new()
    }

    fn parse(&self, input: &str) -> Result<BehaviorParams, SrError> {
        if input.trim().is_empty() {
            Ok(BehaviorParams::None)
        } else {
            Err(SrError::InvalidParams(format!(
                "End takes no parameters, got {:?}",
                input
            )))
        }
    }

    fn validate(&self, params: &BehaviorParams) -> Result<(), SrError> {
        match params {
            BehaviorParams::None => Ok(()),
            other => Err(SrError::InvalidParams(format!(
                "End takes no parameters, got {:?}",
                other
            ))),
        }
    }
}

/// Cross-connect behaviors (End.X, End.DX2, End.DX4, End.DX6): strip
/// segment processing and transmit on an interface towards a next hop.
struct XConnectBehavior {
    name: &'static str,
    /// L2 cross-connect admits an optional VLAN tag.
    l2: bool,
}

impl SrBehavior for XConnectBehavior {
    fn name(&self) -> &str {
        self.name
    }

    fn fwd_type(&self) -> FwdType {
        FwdType::INTERFACE_TX
    }

    fn format(&self, entry: &LocalSid) -> String {
        match &entry.params {
            BehaviorParams::CrossConnect {
                if_index,
                next_hop,
                vlan: Some(vlan),
            } => format!("{} {} vlan {}", if_index, next_hop, vlan),
            BehaviorParams::CrossConnect {
                if_index, next_hop, ..
            } => format!("{} {}", if_index, next_hop),
            other => format!("<invalid params {:?}>", other),
        }
    }

    /// `<if_index> <next_hop> [vlan <id>]`
    fn parse(&self, input: &str) -> Result<BehaviorParams, SrError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let (if_index, next_hop) = match tokens.as_slice() {
            [if_index, next_hop] | [if_index, next_hop, "vlan", _] => (*if_index, *next_hop),
            _ => {
                return Err(SrError::InvalidParams(format!(
                    "{} expects '<if_index> <next_hop> [vlan <id>]'",
                    self.name
                )))
            }
        };
        let if_index: u32 = if_index
            .parse()
            .map_err(|_| SrError::InvalidParams(format!("bad interface index {:?}", if_index)))?;
        let next_hop: IpAddress = next_hop
            .parse()
            .map_err(|_| SrError::InvalidParams(format!("bad next hop {:?}", next_hop)))?;
        let vlan = match tokens.as_slice() {
            [_, _, "vlan", vlan] => Some(
                vlan.parse::<u16>()
                    .ok()
                    .and_then(|v| VlanId::new(v).ok())
                    .ok_or_else(|| SrError::InvalidParams(format!("bad vlan {:?}", vlan)))?,
            ),
            _ => None,
        };
        let params = BehaviorParams::CrossConnect {
            if_index,
            next_hop,
            vlan,
        };
        self.validate(&params)?;
        Ok(params)
    }

    fn validate(&self, params: &BehaviorParams) -> Result<(), SrError> {
        match params {
            BehaviorParams::CrossConnect { vlan: Some(_), .. } if !self.l2 => {
                Err(SrError::InvalidParams(format!(
                    "{} does not take a vlan",
                    self.name
                )))
            }
            BehaviorParams::CrossConnect { .. } => Ok(()),
            other => Err(SrError::InvalidParams(format!(
                "{} expects cross-connect parameters, got {:?}",
                self.name, other
            ))),
        }
    }
}

/// Table-lookup behaviors (End.T, End.DT4, End.DT6): continue with a
/// lookup in a specific routing table.
struct TableBehavior {
    name: &'static str,
}

impl SrBehavior for TableBehavior {
    fn name(&self) -> &str {
        self.name
    }

    fn fwd_type(&self) -> FwdType {
        FwdType::TABLE_LOOKUP
    }

    fn format(&self, entry: &LocalSid) -> String {
        match &entry.params {
            BehaviorParams::TableLookup { table_id } => table_id.to_string(),
            other => format!("<invalid params {:?}>", other),
        }
    }

    fn parse(&self, input: &str) -> Result<BehaviorParams, SrError> {
        let table_id: u32 = input
            .trim()
            .parse()
            .map_err(|_| SrError::InvalidParams(format!("{} expects '<table_id>'", self.name)))?;
        Ok(BehaviorParams::TableLookup { table_id })
    }

    fn validate(&self, params: &BehaviorParams) -> Result<(), SrError> {
        match params {
            BehaviorParams::TableLookup { .. } => Ok(()),
            other => Err(SrError::InvalidParams(format!(
                "{} expects a table id, got {:?}",
                self.name, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FakeBehavior(&'static str);

    impl SrBehavior for FakeBehavior {
        fn name(&self) -> &str {
            self.0
        }
        fn fwd_type(&self) -> FwdType {
            FwdType::FIRST_EXTERNAL
        }
        fn format(&self, _entry: &LocalSid) -> String {
            String::new()
        }
        fn parse(&self, _input: &str) -> Result<BehaviorParams, SrError> {
            Ok(BehaviorParams::None)
        }
        fn validate(&self, _params: &BehaviorParams) -> Result<(), SrError> {
            Ok(())
        }
    }

    #[test]
    fn test_builtins_present() {
        let registry = BehaviorRegistry::with_builtins();
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.code_by_name("End"), Some(SR_BEHAVIOR_END));
        assert_eq!(registry.code_by_name("End.DT4"), Some(SR_BEHAVIOR_END_DT4));
        assert!(registry.get(SR_BEHAVIOR_END_X).is_some());
    }

    #[test]
    fn test_register_below_plugin_base_rejected() {
        let mut registry = BehaviorRegistry::with_builtins();
        let result = registry.register(SR_PLUGIN_CODE_BASE - 1, Arc::new(FakeBehavior("uN")));
        assert_eq!(
            result,
            Err(SrError::ReservedBehaviorCode(SR_PLUGIN_CODE_BASE - 1))
        );
    }

    #[test]
    fn test_register_duplicate_name_and_code() {
        let mut registry = BehaviorRegistry::with_builtins();
        registry
            .register(100, Arc::new(FakeBehavior("uN.plug")))
            .unwrap();

        assert_eq!(
            registry.register(100, Arc::new(FakeBehavior("uN.other"))),
            Err(SrError::DuplicateBehaviorCode(100))
        );
        assert_eq!(
            registry.register(101, Arc::new(FakeBehavior("uN.plug"))),
            Err(SrError::DuplicateBehaviorName("uN.plug".to_string()))
        );
    }

    #[test]
    fn test_xconnect_parse_format() {
        let behavior = XConnectBehavior {
            name: "End.X",
            l2: false,
        };
        let params = behavior.parse("4 2001:db8::1").unwrap();
        assert_eq!(
            params,
            BehaviorParams::CrossConnect {
                if_index: 4,
                next_hop: "2001:db8::1".parse().unwrap(),
                vlan: None,
            }
        );
        assert!(behavior.parse("4").is_err());
        // L3 cross-connect rejects a vlan.
        assert!(behavior.parse("4 2001:db8::1 vlan 100").is_err());
    }

    #[test]
    fn test_dx2_accepts_vlan() {
        let behavior = XConnectBehavior {
            name: "End.DX2",
            l2: true,
        };
        let params = behavior.parse("7 10.0.0.1 vlan 100").unwrap();
        match params {
            BehaviorParams::CrossConnect { vlan: Some(v), .. } => assert_eq!(v.as_u16(), 100),
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_table_parse() {
        let behavior = TableBehavior { name: "End.DT6" };
        assert_eq!(
            behavior.parse(" 42 ").unwrap(),
            BehaviorParams::TableLookup { table_id: 42 }
        );
        assert!(behavior.parse("fast").is_err());
    }

    #[test]
    fn test_end_rejects_params() {
        let behavior = EndBehavior;
        assert_eq!(behavior.parse("").unwrap(), BehaviorParams::None);
        assert!(behavior.parse("42").is_err());
        assert!(behavior
            .validate(&BehaviorParams::TableLookup { table_id: 0 })
            .is_err());
    }
}
