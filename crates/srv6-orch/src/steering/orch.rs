//! Steering table orchestration logic.

use super::types::{SteeringKey, SteeringRule, TrafficType};
use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::error::SrError;
use crate::policy::PolicyIndex;
use sr_types::IpAddress;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SteeringOrchStats {
    pub rules_created: u64,
    pub rules_removed: u64,
}

/// Steering table: L3 longest-prefix and L2 per-interface rules
/// targeting SR policies.
///
/// A reverse per-interface index lets interface-removal events tear
/// down L2 rules without a full-table scan. Reference counts per
/// target policy back the policy-in-use check on policy deletion.
#[derive(Debug, Default)]
pub struct SteeringOrch {
    rules: HashMap<SteeringKey, SteeringRule>,
    l2_by_interface: HashMap<u32, SteeringKey>,
    policy_refs: HashMap<PolicyIndex, usize>,
    stats: SteeringOrchStats,
}

impl SteeringOrch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &SteeringOrchStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, key: &SteeringKey) -> Option<&SteeringRule> {
        self.rules.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SteeringRule> {
        self.rules.values()
    }

    /// Number of steering rules targeting the given policy.
    pub fn policy_ref_count(&self, policy: PolicyIndex) -> usize {
        self.policy_refs.get(&policy).copied().unwrap_or(0)
    }

    /// Inserts a rule. Duplicate keys are rejected rather than
    /// replaced; callers must remove before re-adding.
    pub fn add(&mut self, key: SteeringKey, policy: PolicyIndex) -> Result<(), SrError> {
        if self.rules.contains_key(&key) {
            return Err(SrError::DuplicateSteeringKey(key.to_string()));
        }
        let rule = SteeringRule {
            key,
            traffic_type: key.traffic_type(),
            policy,
        };
        if let SteeringKey::L2 { if_index } = key {
            self.l2_by_interface.insert(if_index, key);
        }
        self.rules.insert(key, rule);
        *self.policy_refs.entry(policy).or_insert(0) += 1;
        self.stats.rules_created += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::NetworkConfig, "SteeringOrch", "steer_add")
                .with_object_id(key.to_string())
                .with_object_type("steering_rule")
                .with_details(serde_json::json!({
                    "policy": policy,
                    "traffic_type": rule.traffic_type.as_u8(),
                }))
        );
        Ok(())
    }

    pub fn del(&mut self, key: &SteeringKey) -> Result<(), SrError> {
        let rule = self
            .rules
            .remove(key)
            .ok_or(SrError::SteeringRuleNotFound)?;
        if let SteeringKey::L2 { if_index } = key {
            self.l2_by_interface.remove(if_index);
        }
        self.unref_policy(rule.policy);
        self.stats.rules_removed += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::NetworkConfig, "SteeringOrch", "steer_del")
                .with_object_id(key.to_string())
                .with_object_type("steering_rule")
        );
        Ok(())
    }

    /// Most-specific L3 match for an address within a routing table.
    pub fn classify_l3(&self, address: &IpAddress, fib_table: u32) -> Option<PolicyIndex> {
        self.rules
            .values()
            .filter_map(|rule| match rule.key {
                SteeringKey::L3 { prefix, fib_table: t }
                    if t == fib_table && prefix.contains(address) =>
                {
                    Some((prefix.prefix_len(), rule.policy))
                }
                _ => None,
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, policy)| policy)
    }

    /// Exact L2 match on the attachment interface.
    pub fn classify_l2(&self, if_index: u32) -> Option<PolicyIndex> {
        self.l2_by_interface
            .get(&if_index)
            .and_then(|key| self.rules.get(key))
            .map(|rule| rule.policy)
    }

    /// Cascade-removes the L2 rule attached to a removed interface.
    /// Returns the rule that was torn down, if any.
    pub fn on_interface_removed(&mut self, if_index: u32) -> Option<SteeringRule> {
        let key = self.l2_by_interface.remove(&if_index)?;
        let rule = self.rules.remove(&key)?;
        self.unref_policy(rule.policy);
        self.stats.rules_removed += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::NetworkConfig, "SteeringOrch", "steer_del")
                .with_object_id(key.to_string())
                .with_object_type("steering_rule")
                .with_details(serde_json::json!({ "reason": "interface_removed" }))
        );
        Some(rule)
    }

    fn unref_policy(&mut self, policy: PolicyIndex) {
        if let Some(count) = self.policy_refs.get_mut(&policy) {
            *count -= 1;
            if *count == 0 {
                self.policy_refs.remove(&policy);
            }
        }
    }
}
