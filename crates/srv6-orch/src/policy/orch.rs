//! SR policy table orchestration logic.

use super::types::{PolicyIndex, PolicyOp, PolicyRef, PolicyType, SrPolicy};
use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::error::SrError;
use crate::fwd::{FwdHandleGuard, FwdProvider, FwdRequest, FwdType};
use crate::sidlist::{RewriteContext, SidListIndex, SidListStore};
use sr_types::Sid;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PolicyOrchStats {
    pub policies_created: u64,
    pub policies_removed: u64,
    pub policies_modified: u64,
}

/// SR policy table: policies keyed by binding SID, owning the segment
/// list store.
///
/// Deletion of a policy that steering still references is enforced by
/// the context, which consults the steering reference counts before
/// calling [`PolicyOrch::delete`].
pub struct PolicyOrch {
    provider: Arc<dyn FwdProvider>,
    store: SidListStore,
    policies: Vec<Option<SrPolicy>>,
    free: Vec<PolicyIndex>,
    bsid_index: HashMap<Sid, PolicyIndex>,
    stats: PolicyOrchStats,
}

impl PolicyOrch {
    pub fn new(provider: Arc<dyn FwdProvider>) -> Self {
        Self {
            store: SidListStore::new(Arc::clone(&provider)),
            provider,
            policies: Vec::new(),
            free: Vec::new(),
            bsid_index: HashMap::new(),
            stats: PolicyOrchStats::default(),
        }
    }

    pub fn store(&self) -> &SidListStore {
        &self.store
    }

    pub fn stats(&self) -> &PolicyOrchStats {
        &self.stats
    }

    pub fn policy_count(&self) -> usize {
        self.bsid_index.len()
    }

    pub fn get(&self, index: PolicyIndex) -> Option<&SrPolicy> {
        self.policies.get(index as usize).and_then(|p| p.as_ref())
    }

    pub fn get_by_bsid(&self, bsid: &Sid) -> Option<&SrPolicy> {
        self.bsid_index.get(bsid).and_then(|&i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolicyIndex, &SrPolicy)> {
        self.policies
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i as PolicyIndex, p)))
    }

    /// Resolves a by-BSID or by-index reference to a live policy index.
    pub fn resolve(&self, policy_ref: &PolicyRef) -> Result<PolicyIndex, SrError> {
        match policy_ref {
            PolicyRef::Bsid(bsid) => self
                .bsid_index
                .get(bsid)
                .copied()
                .ok_or(SrError::PolicyNotFound),
            PolicyRef::Index(index) => {
                if self.get(*index).is_some() {
                    Ok(*index)
                } else {
                    Err(SrError::PolicyNotFound)
                }
            }
        }
    }

    /// Creates a policy with one initial segment list.
    pub fn add(
        &mut self,
        bsid: Sid,
        segments: Vec<Sid>,
        weight: u32,
        policy_type: PolicyType,
        fib_table: u32,
        is_encap: bool,
    ) -> Result<PolicyIndex, SrError> {
        if self.bsid_index.contains_key(&bsid) {
            let err = SrError::DuplicateBsid(bsid);
            audit_log!(
                AuditRecord::new(AuditCategory::ResourceCreate, "PolicyOrch", "policy_add")
                    .with_object_id(bsid.to_string())
                    .with_object_type("sr_policy")
                    .with_error(err.to_string())
            );
            return Err(err);
        }
        if policy_type == PolicyType::Spray && weight != 1 {
            crate::warn_log!(
                "PolicyOrch",
                bsid = %bsid,
                weight,
                "weight is ignored for spray policies"
            );
        }

        let list = self.store.create(segments, weight)?;
        let handles = match self.derive_handles(&[list], policy_type) {
            Ok(handles) => handles,
            Err(e) => {
                // Unwind: the list was never published through a policy.
                let _ = self.store.release(list);
                return Err(e);
            }
        };
        let (bsid_fwd, ip6_fwd, ip4_fwd) = handles;

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.policies.push(None);
                (self.policies.len() - 1) as PolicyIndex
            }
        };
        self.policies[index as usize] = Some(SrPolicy {
            bsid,
            policy_type,
            is_encap,
            fib_table,
            sid_lists: vec![list],
            bsid_fwd,
            ip6_fwd,
            ip4_fwd,
        });
        self.bsid_index.insert(bsid, index);
        self.stats.policies_created += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "PolicyOrch", "policy_add")
                .with_object_id(bsid.to_string())
                .with_object_type("sr_policy")
                .with_details(serde_json::json!({
                    "index": index,
                    "type": format!("{:?}", policy_type),
                    "fib_table": fib_table,
                    "is_encap": is_encap,
                }))
        );
        Ok(index)
    }

    /// Applies a membership mutation, re-deriving the aggregate
    /// forwarding handles before the new membership becomes visible.
    pub fn modify(&mut self, policy_ref: &PolicyRef, op: PolicyOp) -> Result<(), SrError> {
        let index = self.resolve(policy_ref)?;
        match op {
            PolicyOp::AddSidList { segments, weight } => {
                if self.policy(index)?.policy_type == PolicyType::Spray && weight != 1 {
                    crate::warn_log!(
                        "PolicyOrch",
                        policy = index,
                        weight,
                        "weight is ignored for spray policies"
                    );
                }
                let list = self.store.create(segments, weight)?;
                let mut candidate = self.policy(index)?.sid_lists.clone();
                candidate.push(list);
                match self.rederive(index, &candidate) {
                    Ok(()) => {}
                    Err(e) => {
                        let _ = self.store.release(list);
                        return Err(e);
                    }
                }
            }
            PolicyOp::RemoveSidList { list } => {
                let policy = self.policy(index)?;
                if !policy.sid_lists.contains(&list) {
                    return Err(SrError::SidListNotFound(list));
                }
                if policy.sid_lists.len() == 1 {
                    return Err(SrError::LastSidList);
                }
                let candidate: Vec<SidListIndex> = policy
                    .sid_lists
                    .iter()
                    .copied()
                    .filter(|&l| l != list)
                    .collect();
                self.rederive(index, &candidate)?;
                self.store.release(list)?;
            }
            PolicyOp::ModifyWeight { list, weight } => {
                let policy = self.policy(index)?;
                if !policy.sid_lists.contains(&list) {
                    return Err(SrError::SidListNotFound(list));
                }
                if policy.policy_type == PolicyType::Spray {
                    crate::warn_log!(
                        "PolicyOrch",
                        policy = index,
                        list,
                        "weight is ignored for spray policies"
                    );
                }
                let old_weight = self
                    .store
                    .get(list)
                    .ok_or(SrError::SidListNotFound(list))?
                    .weight;
                let lists = policy.sid_lists.clone();
                self.store.update(list, None, Some(weight))?;
                if let Err(e) = self.rederive(index, &lists) {
                    // Keep weight and handles consistent on failure.
                    let _ = self.store.update(list, None, Some(old_weight));
                    return Err(e);
                }
            }
        }
        self.stats.policies_modified += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceModify, "PolicyOrch", "policy_mod")
                .with_object_id(index.to_string())
                .with_object_type("sr_policy")
        );
        Ok(())
    }

    /// Deletes a policy, releasing its member lists and handles.
    pub fn delete(&mut self, policy_ref: &PolicyRef) -> Result<(), SrError> {
        let index = self.resolve(policy_ref)?;
        let policy = self.policies[index as usize]
            .take()
            .ok_or(SrError::PolicyNotFound)?;
        self.bsid_index.remove(&policy.bsid);
        self.free.push(index);
        for list in &policy.sid_lists {
            let _ = self.store.release(*list);
        }
        self.stats.policies_removed += 1;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "PolicyOrch", "policy_del")
                .with_object_id(policy.bsid.to_string())
                .with_object_type("sr_policy")
                .with_details(serde_json::json!({ "index": index }))
        );
        // Aggregate guards and the member lists' guards drop here.
        Ok(())
    }

    /// Load-balance bucket expansion for a policy's current
    /// membership: each list contributes `weight` buckets, in
    /// insertion order.
    pub fn load_balance_buckets(&self, index: PolicyIndex) -> Result<Vec<SidListIndex>, SrError> {
        let policy = self.policy(index)?;
        let mut buckets = Vec::new();
        for &list in &policy.sid_lists {
            let entry = self.store.get(list).ok_or(SrError::SidListNotFound(list))?;
            for _ in 0..entry.weight {
                buckets.push(list);
            }
        }
        Ok(buckets)
    }

    fn policy(&self, index: PolicyIndex) -> Result<&SrPolicy, SrError> {
        self.get(index).ok_or(SrError::PolicyNotFound)
    }

    /// Builds fresh aggregate handles for the candidate membership and
    /// commits membership and handles together.
    fn rederive(
        &mut self,
        index: PolicyIndex,
        candidate: &[SidListIndex],
    ) -> Result<(), SrError> {
        let policy_type = self.policy(index)?.policy_type;
        let (bsid_fwd, ip6_fwd, ip4_fwd) = self.derive_handles(candidate, policy_type)?;

        let policy = self.policies[index as usize]
            .as_mut()
            .ok_or(SrError::PolicyNotFound)?;
        policy.sid_lists = candidate.to_vec();
        policy.bsid_fwd = bsid_fwd;
        policy.ip6_fwd = ip6_fwd;
        policy.ip4_fwd = ip4_fwd;
        Ok(())
    }

    fn derive_handles(
        &self,
        lists: &[SidListIndex],
        policy_type: PolicyType,
    ) -> Result<(FwdHandleGuard, FwdHandleGuard, FwdHandleGuard), SrError> {
        Ok((
            self.derive_one(lists, policy_type, RewriteContext::Bsid)?,
            self.derive_one(lists, policy_type, RewriteContext::Ip6Encap)?,
            self.derive_one(lists, policy_type, RewriteContext::Ip4Encap)?,
        ))
    }

    fn derive_one(
        &self,
        lists: &[SidListIndex],
        policy_type: PolicyType,
        context: RewriteContext,
    ) -> Result<FwdHandleGuard, SrError> {
        match policy_type {
            PolicyType::Default if lists.len() == 1 => {
                let entry = self
                    .store
                    .get(lists[0])
                    .ok_or(SrError::SidListNotFound(lists[0]))?;
                Ok(entry.fwd(context).clone_lock())
            }
            PolicyType::Default => {
                let mut buckets = Vec::new();
                for &list in lists {
                    let entry = self.store.get(list).ok_or(SrError::SidListNotFound(list))?;
                    let handle = entry.fwd(context).handle();
                    for _ in 0..entry.weight {
                        buckets.push(handle);
                    }
                }
                FwdHandleGuard::acquire(
                    &self.provider,
                    FwdType::LOAD_BALANCE,
                    &FwdRequest::LoadBalance { buckets },
                )
            }
            PolicyType::Spray => {
                let mut branches = Vec::with_capacity(lists.len());
                for &list in lists {
                    let entry = self.store.get(list).ok_or(SrError::SidListNotFound(list))?;
                    branches.push(entry.fwd(context).handle());
                }
                FwdHandleGuard::acquire(
                    &self.provider,
                    FwdType::REPLICATE,
                    &FwdRequest::Replicate { branches },
                )
            }
        }
    }
}
