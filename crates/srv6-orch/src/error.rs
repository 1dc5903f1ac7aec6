//! Error type for SRv6 control-plane mutations.

use sr_types::Sid;
use thiserror::Error;

/// Errors returned by SRv6 policy, LocalSID and steering mutations.
///
/// Every mutation is synchronous: it either commits fully or returns
/// one of these without leaving partial state visible to forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrError {
    #[error("BSID already present: {0}")]
    DuplicateBsid(Sid),

    #[error("LocalSID already present: {0}")]
    DuplicateLocalSid(Sid),

    #[error("behavior name already registered: {0}")]
    DuplicateBehaviorName(String),

    #[error("behavior code already registered: {0}")]
    DuplicateBehaviorCode(u16),

    #[error("steering key already present: {0}")]
    DuplicateSteeringKey(String),

    #[error("SR policy not found")]
    PolicyNotFound,

    #[error("segment list {0} is not a member of the policy")]
    SidListNotFound(u32),

    #[error("LocalSID not found: {0}")]
    LocalSidNotFound(Sid),

    #[error("behavior code not registered: {0}")]
    BehaviorNotFound(u16),

    #[error("steering rule not found")]
    SteeringRuleNotFound,

    #[error("cannot remove the last segment list of a policy")]
    LastSidList,

    #[error("policy {0} is still referenced by steering rules")]
    PolicyInUse(u32),

    #[error("behavior code {0} collides with the reserved built-in range")]
    ReservedBehaviorCode(u16),

    #[error("segment list must contain at least one segment")]
    EmptySegmentList,

    #[error("segment list of {0} segments exceeds the routing header capacity")]
    SegmentListTooLong(usize),

    #[error("segment list weight must be positive")]
    InvalidWeight,

    #[error("invalid parameters for behavior: {0}")]
    InvalidParams(String),

    #[error("creation hook rejected LocalSID: {0}")]
    CreationHookFailed(String),

    #[error("forwarding handle acquisition failed: {0}")]
    FwdAcquireFailed(String),

    #[error("malformed segment routing header: {0}")]
    MalformedRewrite(String),
}
