//! Forwarding-handle registry interface.
//!
//! The forwarding-object graph itself lives outside this crate. The
//! engine only acquires handles into it, locks them while they are
//! stored in a segment list, policy or LocalSID, and unlocks them when
//! the owner is destroyed or re-derives its handles. The
//! [`FwdHandleGuard`] wrapper makes that pairing structural: every
//! acquisition or explicit lock is matched by exactly one unlock when
//! the guard drops.

mod types;

pub use types::{FwdHandle, FwdRequest, FwdType};

use crate::error::SrError;
use std::fmt;
use std::sync::Arc;

/// External forwarding-object registry.
///
/// `acquire` returns a handle with one reference held on behalf of the
/// caller; `lock`/`unlock` adjust that reference count. The engine
/// treats handles as opaque capabilities and never inspects the
/// provider's internal representation.
pub trait FwdProvider: Send + Sync {
    fn acquire(&self, fwd_type: FwdType, request: &FwdRequest) -> Result<FwdHandle, String>;
    fn lock(&self, handle: FwdHandle);
    fn unlock(&self, handle: FwdHandle);
}

/// Scoped ownership of one reference on a forwarding handle.
///
/// Dropping the guard releases the reference. Guards are deliberately
/// not `Clone`; taking an additional reference is explicit via
/// [`FwdHandleGuard::clone_lock`].
pub struct FwdHandleGuard {
    handle: FwdHandle,
    provider: Arc<dyn FwdProvider>,
}

impl FwdHandleGuard {
    /// Acquires a fresh handle from the provider, holding one reference.
    pub fn acquire(
        provider: &Arc<dyn FwdProvider>,
        fwd_type: FwdType,
        request: &FwdRequest,
    ) -> Result<Self, SrError> {
        let handle = provider
            .acquire(fwd_type, request)
            .map_err(SrError::FwdAcquireFailed)?;
        Ok(Self {
            handle,
            provider: Arc::clone(provider),
        })
    }

    /// Takes an additional reference on the same handle.
    pub fn clone_lock(&self) -> Self {
        self.provider.lock(self.handle);
        Self {
            handle: self.handle,
            provider: Arc::clone(&self.provider),
        }
    }

    pub fn handle(&self) -> FwdHandle {
        self.handle
    }
}

impl Drop for FwdHandleGuard {
    fn drop(&mut self) {
        self.provider.unlock(self.handle);
    }
}

impl fmt::Debug for FwdHandleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FwdHandleGuard")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Test provider that hands out sequential handles and tracks the
    /// reference balance per handle, so tests can assert that every
    /// acquisition was paired with a release.
    pub struct MockFwdProvider {
        next_index: AtomicU32,
        refs: Mutex<HashMap<FwdHandle, i64>>,
        pub fail_acquire: std::sync::atomic::AtomicBool,
        /// Buckets of the most recent load-balance acquisition.
        pub last_lb_buckets: Mutex<Option<Vec<FwdHandle>>>,
        /// Branches of the most recent replicate acquisition.
        pub last_replicate_branches: Mutex<Option<Vec<FwdHandle>>>,
    }

    impl MockFwdProvider {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                next_index: AtomicU32::new(1),
                refs: Mutex::new(HashMap::new()),
                fail_acquire: std::sync::atomic::AtomicBool::new(false),
                last_lb_buckets: Mutex::new(None),
                last_replicate_branches: Mutex::new(None),
            })
        }

        /// Sum of outstanding references across all handles.
        pub fn outstanding_refs(&self) -> i64 {
            self.refs.lock().unwrap().values().sum()
        }
    }

    impl FwdProvider for MockFwdProvider {
        fn acquire(&self, fwd_type: FwdType, request: &FwdRequest) -> Result<FwdHandle, String> {
            if self.fail_acquire.load(Ordering::SeqCst) {
                return Err("mock acquire failure".to_string());
            }
            match request {
                FwdRequest::LoadBalance { buckets } => {
                    *self.last_lb_buckets.lock().unwrap() = Some(buckets.clone());
                }
                FwdRequest::Replicate { branches } => {
                    *self.last_replicate_branches.lock().unwrap() = Some(branches.clone());
                }
                _ => {}
            }
            let handle = FwdHandle {
                fwd_type,
                index: self.next_index.fetch_add(1, Ordering::SeqCst),
            };
            *self.refs.lock().unwrap().entry(handle).or_insert(0) += 1;
            Ok(handle)
        }

        fn lock(&self, handle: FwdHandle) {
            *self.refs.lock().unwrap().entry(handle).or_insert(0) += 1;
        }

        fn unlock(&self, handle: FwdHandle) {
            *self.refs.lock().unwrap().entry(handle).or_insert(0) -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFwdProvider;
    use super::*;
    use crate::sidlist::RewriteContext;

    #[test]
    fn test_guard_releases_on_drop() {
        let provider = MockFwdProvider::new();
        let dyn_provider: Arc<dyn FwdProvider> = provider.clone();

        let request = FwdRequest::SidListRewrite {
            list: 0,
            context: RewriteContext::Bsid,
        };
        let guard = FwdHandleGuard::acquire(&dyn_provider, FwdType::SR_REWRITE, &request).unwrap();
        assert_eq!(provider.outstanding_refs(), 1);

        drop(guard);
        assert_eq!(provider.outstanding_refs(), 0);
    }

    #[test]
    fn test_clone_lock_takes_extra_reference() {
        let provider = MockFwdProvider::new();
        let dyn_provider: Arc<dyn FwdProvider> = provider.clone();

        let request = FwdRequest::TableLookup { table_id: 0 };
        let guard = FwdHandleGuard::acquire(&dyn_provider, FwdType::TABLE_LOOKUP, &request).unwrap();
        let extra = guard.clone_lock();
        assert_eq!(extra.handle(), guard.handle());
        assert_eq!(provider.outstanding_refs(), 2);

        drop(guard);
        assert_eq!(provider.outstanding_refs(), 1);
        drop(extra);
        assert_eq!(provider.outstanding_refs(), 0);
    }

    #[test]
    fn test_acquire_failure_maps_to_error() {
        let provider = MockFwdProvider::new();
        provider
            .fail_acquire
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let dyn_provider: Arc<dyn FwdProvider> = provider.clone();

        let request = FwdRequest::TableLookup { table_id: 0 };
        let result = FwdHandleGuard::acquire(&dyn_provider, FwdType::TABLE_LOOKUP, &request);
        assert!(matches!(result, Err(SrError::FwdAcquireFailed(_))));
        assert_eq!(provider.outstanding_refs(), 0);
    }
}
