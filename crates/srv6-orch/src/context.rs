//! Process-wide segment-routing context.
//!
//! One explicitly constructed [`SrContext`] owns the policy, LocalSID
//! and steering tables and enforces the cross-table invariants the
//! individual tables cannot see, such as rejecting deletion of a
//! policy that steering still targets. Mutations run on a single
//! control thread; the read path only hands out fully formed entries
//! and shared buffer snapshots.

use crate::counters::CounterPair;
use crate::error::SrError;
use crate::fwd::FwdProvider;
use crate::localsid::{BehaviorCode, BehaviorParams, LocalSid, LocalSidOrch, SrBehavior};
use crate::policy::{PolicyIndex, PolicyOp, PolicyOrch, PolicyRef, PolicyType, SrPolicy};
use crate::steering::{SteeringKey, SteeringOrch, SteeringRule};
use sr_types::{IpAddress, Sid};
use std::sync::Arc;

/// Destination-address resolution result for forwarding nodes.
#[derive(Debug)]
pub enum DestMatch<'a> {
    /// The address is a policy's binding SID.
    Policy(&'a SrPolicy),
    /// The address is a LocalSID this node terminates.
    LocalSid(&'a LocalSid),
}

pub struct SrContext {
    policies: PolicyOrch,
    localsids: LocalSidOrch,
    steering: SteeringOrch,
}

impl SrContext {
    pub fn new(provider: Arc<dyn FwdProvider>) -> Self {
        Self {
            policies: PolicyOrch::new(Arc::clone(&provider)),
            localsids: LocalSidOrch::new(provider),
            steering: SteeringOrch::new(),
        }
    }

    pub fn policies(&self) -> &PolicyOrch {
        &self.policies
    }

    pub fn localsids(&self) -> &LocalSidOrch {
        &self.localsids
    }

    pub fn steering(&self) -> &SteeringOrch {
        &self.steering
    }

    // Policy mutations.

    #[allow(clippy::too_many_arguments)]
    pub fn policy_add(
        &mut self,
        bsid: Sid,
        segments: Vec<Sid>,
        weight: u32,
        policy_type: PolicyType,
        fib_table: u32,
        is_encap: bool,
    ) -> Result<PolicyIndex, SrError> {
        self.policies
            .add(bsid, segments, weight, policy_type, fib_table, is_encap)
    }

    pub fn policy_mod(&mut self, policy_ref: &PolicyRef, op: PolicyOp) -> Result<(), SrError> {
        self.policies.modify(policy_ref, op)
    }

    /// Deletes a policy, rejected while any steering rule still
    /// targets it.
    pub fn policy_del(&mut self, policy_ref: &PolicyRef) -> Result<(), SrError> {
        let index = self.policies.resolve(policy_ref)?;
        let refs = self.steering.policy_ref_count(index);
        if refs > 0 {
            return Err(SrError::PolicyInUse(index));
        }
        self.policies.delete(policy_ref)
    }

    // LocalSID mutations.

    pub fn localsid_add(
        &mut self,
        address: Sid,
        behavior: BehaviorCode,
        params: BehaviorParams,
        fib_table: u32,
        end_psp: bool,
    ) -> Result<(), SrError> {
        self.localsids
            .add(address, behavior, params, fib_table, end_psp)
    }

    pub fn localsid_del(&mut self, address: &Sid) -> Result<Option<String>, SrError> {
        self.localsids.remove(address)
    }

    pub fn register_behavior(
        &mut self,
        code: BehaviorCode,
        behavior: Arc<dyn SrBehavior>,
    ) -> Result<(), SrError> {
        self.localsids.register_behavior(code, behavior)
    }

    // Steering mutations.

    /// Adds a steering rule; the target policy must exist.
    pub fn steer_add(&mut self, key: SteeringKey, policy_ref: &PolicyRef) -> Result<(), SrError> {
        let index = self.policies.resolve(policy_ref)?;
        self.steering.add(key, index)
    }

    pub fn steer_del(&mut self, key: &SteeringKey) -> Result<(), SrError> {
        self.steering.del(key)
    }

    /// Interface-removal event: cascades away the L2 steering rule
    /// attached to the interface.
    pub fn on_interface_removed(&mut self, if_index: u32) -> Option<SteeringRule> {
        self.steering.on_interface_removed(if_index)
    }

    // Read path.

    /// Resolves a destination address to the policy (BSID match) or
    /// LocalSID terminating it.
    pub fn resolve_destination(&self, address: &Sid) -> Option<DestMatch<'_>> {
        if let Some(policy) = self.policies.get_by_bsid(address) {
            return Some(DestMatch::Policy(policy));
        }
        self.localsids.lookup(address).map(DestMatch::LocalSid)
    }

    /// Most-specific L3 steering match within a routing table.
    pub fn classify_l3(&self, address: &IpAddress, fib_table: u32) -> Option<&SrPolicy> {
        self.steering
            .classify_l3(address, fib_table)
            .and_then(|index| self.policies.get(index))
    }

    /// L2 steering match on the attachment interface.
    pub fn classify_l2(&self, if_index: u32) -> Option<&SrPolicy> {
        self.steering
            .classify_l2(if_index)
            .and_then(|index| self.policies.get(index))
    }

    /// Forwarding-time LocalSID hit accounting.
    pub fn record_localsid_hit(&self, address: &Sid, valid: bool, bytes: u64) {
        self.localsids.record_hit(address, valid, bytes);
    }

    pub fn localsid_counters(&self, address: &Sid) -> Option<&CounterPair> {
        self.localsids.counters(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fwd::mock::MockFwdProvider;
    use crate::localsid::SR_BEHAVIOR_END;
    use crate::sidlist::RewriteContext;
    use pretty_assertions::assert_eq;
    use sr_types::IpPrefix;

    fn sid(s: &str) -> Sid {
        s.parse().unwrap()
    }

    fn sids(addrs: &[&str]) -> Vec<Sid> {
        addrs.iter().map(|a| a.parse().unwrap()).collect()
    }

    fn l3(prefix: &str, fib_table: u32) -> SteeringKey {
        SteeringKey::L3 {
            prefix: prefix.parse::<IpPrefix>().unwrap(),
            fib_table,
        }
    }

    fn new_ctx() -> (Arc<MockFwdProvider>, SrContext) {
        let provider = MockFwdProvider::new();
        let ctx = SrContext::new(provider.clone());
        (provider, ctx)
    }

    #[test]
    fn test_steering_resolves_to_most_specific_policy() {
        let (_, mut ctx) = new_ctx();
        let a = ctx
            .policy_add(
                sid("2001:db8::a"),
                sids(&["fc00::1"]),
                1,
                PolicyType::Default,
                0,
                true,
            )
            .unwrap();
        let b = ctx
            .policy_add(
                sid("2001:db8::b"),
                sids(&["fc00::2"]),
                1,
                PolicyType::Default,
                0,
                true,
            )
            .unwrap();

        ctx.steer_add(l3("2001:db8::/32", 0), &PolicyRef::Index(a))
            .unwrap();
        ctx.steer_add(l3("2001:db8:1::/48", 0), &PolicyRef::Index(b))
            .unwrap();

        let hit = ctx
            .classify_l3(&"2001:db8:1::1".parse().unwrap(), 0)
            .unwrap();
        assert_eq!(hit.bsid, sid("2001:db8::b"));
        let hit = ctx
            .classify_l3(&"2001:db8:2::1".parse().unwrap(), 0)
            .unwrap();
        assert_eq!(hit.bsid, sid("2001:db8::a"));
    }

    #[test]
    fn test_policy_delete_blocked_while_steered() {
        let (_, mut ctx) = new_ctx();
        let index = ctx
            .policy_add(
                sid("2001:db8::a"),
                sids(&["fc00::1"]),
                1,
                PolicyType::Default,
                0,
                true,
            )
            .unwrap();
        ctx.steer_add(l3("2001:db8::/32", 0), &PolicyRef::Index(index))
            .unwrap();

        let result = ctx.policy_del(&PolicyRef::Index(index));
        assert_eq!(result, Err(SrError::PolicyInUse(index)));
        assert!(ctx.policies().get(index).is_some());

        ctx.steer_del(&l3("2001:db8::/32", 0)).unwrap();
        ctx.policy_del(&PolicyRef::Index(index)).unwrap();
        assert!(ctx.policies().get(index).is_none());
    }

    #[test]
    fn test_steer_add_requires_existing_policy() {
        let (_, mut ctx) = new_ctx();
        let result = ctx.steer_add(l3("2001:db8::/32", 0), &PolicyRef::Bsid(sid("::1")));
        assert_eq!(result, Err(SrError::PolicyNotFound));
        assert!(ctx.steering().is_empty());
    }

    #[test]
    fn test_destination_resolution_bsid_and_localsid() {
        let (_, mut ctx) = new_ctx();
        ctx.policy_add(
            sid("2001:db8::100"),
            sids(&["fc00::1", "fc00::2"]),
            1,
            PolicyType::Default,
            0,
            true,
        )
        .unwrap();
        ctx.localsid_add(
            sid("2001:db8::200"),
            SR_BEHAVIOR_END,
            BehaviorParams::None,
            0,
            false,
        )
        .unwrap();

        match ctx.resolve_destination(&sid("2001:db8::100")) {
            Some(DestMatch::Policy(policy)) => {
                // Forwarding picks the context-specific aggregate handle
                // and the member lists' rewrite snapshots.
                assert_eq!(policy.sid_lists.len(), 1);
                let list = ctx.policies().store().get(policy.sid_lists[0]).unwrap();
                assert!(!list.rewrite(RewriteContext::Bsid).is_empty());
            }
            other => panic!("unexpected resolution {:?}", other),
        }
        match ctx.resolve_destination(&sid("2001:db8::200")) {
            Some(DestMatch::LocalSid(entry)) => assert_eq!(entry.behavior, SR_BEHAVIOR_END),
            other => panic!("unexpected resolution {:?}", other),
        }
        assert!(ctx.resolve_destination(&sid("2001:db8::300")).is_none());
    }

    #[test]
    fn test_interface_removal_cascades_l2_rule() {
        let (_, mut ctx) = new_ctx();
        let index = ctx
            .policy_add(
                sid("2001:db8::a"),
                sids(&["fc00::1"]),
                1,
                PolicyType::Default,
                0,
                true,
            )
            .unwrap();
        ctx.steer_add(SteeringKey::L2 { if_index: 4 }, &PolicyRef::Index(index))
            .unwrap();
        assert!(ctx.classify_l2(4).is_some());

        let torn_down = ctx.on_interface_removed(4).unwrap();
        assert_eq!(torn_down.policy, index);
        assert!(ctx.classify_l2(4).is_none());
        // The policy itself survives and is now deletable.
        ctx.policy_del(&PolicyRef::Index(index)).unwrap();
    }

    #[test]
    fn test_localsid_hit_counting_through_context() {
        let (_, mut ctx) = new_ctx();
        ctx.localsid_add(
            sid("fc00::1"),
            SR_BEHAVIOR_END,
            BehaviorParams::None,
            0,
            false,
        )
        .unwrap();

        ctx.record_localsid_hit(&sid("fc00::1"), true, 120);
        ctx.record_localsid_hit(&sid("fc00::1"), false, 80);

        let pair = ctx.localsid_counters(&sid("fc00::1")).unwrap();
        assert_eq!(pair.valid.snapshot().packets, 1);
        assert_eq!(pair.invalid.snapshot().bytes, 80);
    }

    #[test]
    fn test_full_teardown_releases_every_handle() {
        let (provider, mut ctx) = new_ctx();
        let index = ctx
            .policy_add(
                sid("2001:db8::a"),
                sids(&["fc00::1"]),
                1,
                PolicyType::Default,
                0,
                true,
            )
            .unwrap();
        ctx.policy_mod(
            &PolicyRef::Index(index),
            PolicyOp::AddSidList {
                segments: sids(&["fc00::2"]),
                weight: 2,
            },
        )
        .unwrap();
        ctx.localsid_add(
            sid("fc00::100"),
            SR_BEHAVIOR_END,
            BehaviorParams::None,
            0,
            false,
        )
        .unwrap();
        assert!(provider.outstanding_refs() > 0);

        ctx.localsid_del(&sid("fc00::100")).unwrap();
        ctx.policy_del(&PolicyRef::Index(index)).unwrap();
        assert_eq!(provider.outstanding_refs(), 0);
    }
}
