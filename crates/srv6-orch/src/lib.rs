//! SRv6 control-plane state engine.
//!
//! Manages the three tables a segment-routing head-end and endpoint
//! node needs:
//!
//! - SR policies keyed by binding SID, each owning weighted segment
//!   lists with precomputed rewrite buffers ([`policy`], [`sidlist`])
//! - LocalSID endpoints with pluggable behaviors ([`localsid`])
//! - Steering rules classifying traffic into policies ([`steering`])
//!
//! The forwarding plane is an external collaborator reached through
//! the [`fwd::FwdProvider`] trait; this crate never interprets a
//! forwarding handle, it only pairs every acquisition with exactly one
//! release. All tables hang off one explicitly constructed
//! [`context::SrContext`].
//!
//! Mutations are synchronous and single-writer; the read path hands
//! out shared buffer snapshots (`Arc<[u8]>`) that stay self-consistent
//! across concurrent rebuilds.

pub mod audit;
pub mod context;
pub mod counters;
pub mod error;
pub mod fwd;
pub mod localsid;
pub mod policy;
pub mod sidlist;
pub mod steering;

pub use context::{DestMatch, SrContext};
pub use error::SrError;
