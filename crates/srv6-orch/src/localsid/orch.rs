//! LocalSID table orchestration logic.

use super::behavior::{BehaviorRegistry, SrBehavior};
use super::types::{BehaviorCode, BehaviorParams, LocalSid};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::counters::{CounterPair, CounterSlab};
use crate::error::SrError;
use crate::fwd::{FwdHandleGuard, FwdProvider, FwdRequest};
use crate::{audit_log, warn_log};
use sr_types::Sid;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct LocalSidOrchStats {
    pub localsids_created: u64,
    pub localsids_removed: u64,
    pub hook_failures: u64,
}

/// LocalSID table: exact-match endpoint entries with per-entry
/// valid/invalid counters and behavior dispatch.
pub struct LocalSidOrch {
    provider: Arc<dyn FwdProvider>,
    registry: BehaviorRegistry,
    entries: HashMap<Sid, LocalSid>,
    counters: CounterSlab,
    stats: LocalSidOrchStats,
}

impl LocalSidOrch {
    pub fn new(provider: Arc<dyn FwdProvider>) -> Self {
        Self {
            provider,
            registry: BehaviorRegistry::with_builtins(),
            entries: HashMap::new(),
            counters: CounterSlab::new(),
            stats: LocalSidOrchStats::default(),
        }
    }

    pub fn stats(&self) -> &LocalSidOrchStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match lookup. LocalSIDs are host addresses; there is no
    /// longest-prefix matching here.
    pub fn lookup(&self, address: &Sid) -> Option<&LocalSid> {
        self.entries.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalSid> {
        self.entries.values()
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn register_behavior(
        &mut self,
        code: BehaviorCode,
        behavior: Arc<dyn SrBehavior>,
    ) -> Result<(), SrError> {
        let name = behavior.name().to_string();
        match self.registry.register(code, behavior) {
            Ok(()) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceCreate,
                    "LocalSidOrch",
                    "behavior_register"
                )
                .with_object_id(name)
                .with_object_type("sr_behavior")
                .with_details(serde_json::json!({ "code": code })));
                Ok(())
            }
            Err(e) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceCreate,
                    "LocalSidOrch",
                    "behavior_register"
                )
                .with_object_id(name)
                .with_object_type("sr_behavior")
                .with_error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Creates a LocalSID. The behavior's creation hook runs on the
    /// fully built entry before it becomes visible; a hook failure
    /// discards the entry entirely.
    pub fn add(
        &mut self,
        address: Sid,
        behavior_code: BehaviorCode,
        params: BehaviorParams,
        fib_table: u32,
        end_psp: bool,
    ) -> Result<(), SrError> {
        if self.entries.contains_key(&address) {
            return Err(SrError::DuplicateLocalSid(address));
        }
        let behavior = self
            .registry
            .get(behavior_code)
            .ok_or(SrError::BehaviorNotFound(behavior_code))?
            .clone();
        behavior.validate(&params)?;

        let request = match &params {
            BehaviorParams::None => FwdRequest::Endpoint {
                behavior: behavior_code,
            },
            BehaviorParams::CrossConnect {
                if_index, next_hop, ..
            } => FwdRequest::InterfaceTx {
                if_index: *if_index,
                next_hop: *next_hop,
            },
            BehaviorParams::TableLookup { table_id } => FwdRequest::TableLookup {
                table_id: *table_id,
            },
        };
        let fwd = FwdHandleGuard::acquire(&self.provider, behavior.fwd_type(), &request)?;

        let counter_slot = self.counters.alloc_slot();
        let mut entry = LocalSid {
            address,
            behavior: behavior_code,
            params,
            end_psp,
            fib_table,
            counter_slot,
            fwd,
            plugin_mem: None,
        };

        if let Err(msg) = behavior.on_create(&mut entry) {
            // The entry was never visible; unwind the slot and the
            // handle (guard drops with the entry).
            self.counters.release_slot(counter_slot);
            self.stats.hook_failures += 1;
            let err = SrError::CreationHookFailed(msg);
            audit_log!(AuditRecord::new(
                AuditCategory::ResourceCreate,
                "LocalSidOrch",
                "localsid_add"
            )
            .with_object_id(address.to_string())
            .with_object_type("localsid")
            .with_error(err.to_string()));
            return Err(err);
        }

        self.entries.insert(address, entry);
        self.stats.localsids_created += 1;
        audit_log!(AuditRecord::new(
            AuditCategory::ResourceCreate,
            "LocalSidOrch",
            "localsid_add"
        )
        .with_object_id(address.to_string())
        .with_object_type("localsid")
        .with_details(serde_json::json!({
            "behavior": behavior.name(),
            "fib_table": fib_table,
            "end_psp": end_psp,
        })));
        Ok(())
    }

    /// Removes a LocalSID. The behavior's removal hook runs first; a
    /// hook failure is returned as a warning and does not block the
    /// removal.
    pub fn remove(&mut self, address: &Sid) -> Result<Option<String>, SrError> {
        let mut entry = self
            .entries
            .remove(address)
            .ok_or(SrError::LocalSidNotFound(*address))?;

        let mut warning = None;
        if let Some(behavior) = self.registry.get(entry.behavior) {
            if let Err(msg) = behavior.clone().on_remove(&mut entry) {
                warn_log!(
                    "LocalSidOrch",
                    address = %address,
                    error = %msg,
                    "removal hook failed, detaching entry anyway"
                );
                self.stats.hook_failures += 1;
                warning = Some(msg);
            }
        }

        self.counters.release_slot(entry.counter_slot);
        self.stats.localsids_removed += 1;
        let record = AuditRecord::new(AuditCategory::ResourceDelete, "LocalSidOrch", "localsid_del")
            .with_object_id(address.to_string())
            .with_object_type("localsid");
        let record = match &warning {
            Some(msg) => record
                .with_outcome(AuditOutcome::Warning)
                .with_details(serde_json::json!({ "hook_warning": msg })),
            None => record,
        };
        audit_log!(record);
        Ok(warning)
    }

    /// Management representation of an entry, delegated to its
    /// behavior's formatter.
    pub fn format(&self, address: &Sid) -> Result<String, SrError> {
        let entry = self
            .entries
            .get(address)
            .ok_or(SrError::LocalSidNotFound(*address))?;
        let behavior = self
            .registry
            .get(entry.behavior)
            .ok_or(SrError::BehaviorNotFound(entry.behavior))?;
        let params = behavior.format(entry);
        if params.is_empty() {
            Ok(format!("{} behavior {}", entry.address, behavior.name()))
        } else {
            Ok(format!(
                "{} behavior {} {}",
                entry.address,
                behavior.name(),
                params
            ))
        }
    }

    /// Forwarding-time hit accounting: increments the matched entry's
    /// valid or invalid counter. Unknown addresses are ignored.
    pub fn record_hit(&self, address: &Sid, valid: bool, bytes: u64) {
        if let Some(entry) = self.entries.get(address) {
            if let Some(pair) = self.counters.get(entry.counter_slot) {
                if valid {
                    pair.valid.increment(bytes);
                } else {
                    pair.invalid.increment(bytes);
                }
            }
        }
    }

    /// Counter pair of an entry, by address.
    pub fn counters(&self, address: &Sid) -> Option<&CounterPair> {
        self.entries
            .get(address)
            .and_then(|e| self.counters.get(e.counter_slot))
    }
}
