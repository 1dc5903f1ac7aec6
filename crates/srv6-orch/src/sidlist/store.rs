//! Segment list store.

use super::rewrite::{encode_encap, encode_srh, IP_PROTO_IPIP, IP_PROTO_IPV6, SRH_MAX_SEGMENTS};
use super::types::{RewriteContext, SegmentList, SidListIndex};
use crate::error::SrError;
use crate::fwd::{FwdHandleGuard, FwdProvider, FwdRequest, FwdType};
use sr_types::Sid;
use std::sync::Arc;

/// Pool of segment lists with stable indices.
///
/// Policies reference lists by index; released indices are recycled.
/// Every entry is fully formed before it is stored: buffers and
/// forwarding handles are built first, then the slot is published in
/// one assignment.
pub struct SidListStore {
    provider: Arc<dyn FwdProvider>,
    slots: Vec<Option<SegmentList>>,
    free: Vec<SidListIndex>,
}

impl SidListStore {
    pub fn new(provider: Arc<dyn FwdProvider>) -> Self {
        Self {
            provider,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live segment lists.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: SidListIndex) -> Option<&SegmentList> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }

    /// Creates a segment list, precomputing all three rewrite buffers
    /// and acquiring their forwarding handles before the entry becomes
    /// visible.
    pub fn create(&mut self, segments: Vec<Sid>, weight: u32) -> Result<SidListIndex, SrError> {
        validate(&segments, weight)?;

        let id = match self.free.last() {
            Some(&id) => id,
            None => self.slots.len() as SidListIndex,
        };

        let (bsid_fwd, ip6_fwd, ip4_fwd) = self.acquire_handles(id)?;
        let entry = SegmentList {
            rewrite_bsid: encode_srh(&segments, 0).into(),
            rewrite_ip6: encode_encap(&segments, IP_PROTO_IPV6).into(),
            rewrite_ip4: encode_encap(&segments, IP_PROTO_IPIP).into(),
            segments,
            weight,
            bsid_fwd,
            ip6_fwd,
            ip4_fwd,
        };

        if self.free.pop().is_some() {
            self.slots[id as usize] = Some(entry);
        } else {
            self.slots.push(Some(entry));
        }
        Ok(id)
    }

    /// Updates segments and/or weight of an existing list.
    ///
    /// A segment change regenerates all rewrite buffers and handles
    /// and swaps them in whole; a pure weight change touches neither.
    pub fn update(
        &mut self,
        id: SidListIndex,
        segments: Option<Vec<Sid>>,
        weight: Option<u32>,
    ) -> Result<(), SrError> {
        if self.get(id).is_none() {
            return Err(SrError::SidListNotFound(id));
        }

        if let Some(segments) = segments {
            validate(&segments, weight.unwrap_or(1))?;
            let rewrite_bsid: Arc<[u8]> = encode_srh(&segments, 0).into();
            let rewrite_ip6: Arc<[u8]> = encode_encap(&segments, IP_PROTO_IPV6).into();
            let rewrite_ip4: Arc<[u8]> = encode_encap(&segments, IP_PROTO_IPIP).into();
            let (bsid_fwd, ip6_fwd, ip4_fwd) = self.acquire_handles(id)?;

            // Everything rebuilt; now swap. Old guards drop afterwards.
            let entry = self.slots[id as usize]
                .as_mut()
                .ok_or(SrError::SidListNotFound(id))?;
            entry.segments = segments;
            entry.rewrite_bsid = rewrite_bsid;
            entry.rewrite_ip6 = rewrite_ip6;
            entry.rewrite_ip4 = rewrite_ip4;
            entry.bsid_fwd = bsid_fwd;
            entry.ip6_fwd = ip6_fwd;
            entry.ip4_fwd = ip4_fwd;
        }

        if let Some(weight) = weight {
            if weight == 0 {
                return Err(SrError::InvalidWeight);
            }
            let entry = self.slots[id as usize]
                .as_mut()
                .ok_or(SrError::SidListNotFound(id))?;
            entry.weight = weight;
        }

        Ok(())
    }

    /// Releases a list; its handle guards release the forwarding
    /// handles on drop.
    pub fn release(&mut self, id: SidListIndex) -> Result<(), SrError> {
        match self.slots.get_mut(id as usize).and_then(Option::take) {
            Some(_) => {
                self.free.push(id);
                Ok(())
            }
            None => Err(SrError::SidListNotFound(id)),
        }
    }

    fn acquire_handles(
        &self,
        id: SidListIndex,
    ) -> Result<(FwdHandleGuard, FwdHandleGuard, FwdHandleGuard), SrError> {
        let acquire = |context| {
            FwdHandleGuard::acquire(
                &self.provider,
                FwdType::SR_REWRITE,
                &FwdRequest::SidListRewrite { list: id, context },
            )
        };
        Ok((
            acquire(RewriteContext::Bsid)?,
            acquire(RewriteContext::Ip6Encap)?,
            acquire(RewriteContext::Ip4Encap)?,
        ))
    }
}

fn validate(segments: &[Sid], weight: u32) -> Result<(), SrError> {
    if segments.is_empty() {
        return Err(SrError::EmptySegmentList);
    }
    if segments.len() > SRH_MAX_SEGMENTS {
        return Err(SrError::SegmentListTooLong(segments.len()));
    }
    if weight == 0 {
        return Err(SrError::InvalidWeight);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fwd::mock::MockFwdProvider;
    use crate::sidlist::rewrite::decode_srh;
    use pretty_assertions::assert_eq;

    fn sids(addrs: &[&str]) -> Vec<Sid> {
        addrs.iter().map(|a| a.parse().unwrap()).collect()
    }

    fn new_store() -> (Arc<MockFwdProvider>, SidListStore) {
        let provider = MockFwdProvider::new();
        let store = SidListStore::new(provider.clone());
        (provider, store)
    }

    #[test]
    fn test_create_and_get() {
        let (_, mut store) = new_store();
        let id = store.create(sids(&["fc00::1", "fc00::2"]), 1).unwrap();

        let entry = store.get(id).unwrap();
        assert_eq!(entry.segments.len(), 2);
        assert_eq!(entry.weight, 1);

        let (decoded, segments_left) = decode_srh(&entry.rewrite_bsid).unwrap();
        assert_eq!(decoded, entry.segments);
        assert_eq!(segments_left, 1);
    }

    #[test]
    fn test_create_rejects_empty_segments() {
        let (provider, mut store) = new_store();
        assert_eq!(store.create(vec![], 1), Err(SrError::EmptySegmentList));
        assert!(store.is_empty());
        // Nothing acquired for a rejected list.
        assert_eq!(provider.outstanding_refs(), 0);
    }

    #[test]
    fn test_segment_count_capped_at_header_capacity() {
        let (provider, mut store) = new_store();
        let seg = |i: usize| format!("fc00::{:x}", i + 1).parse::<Sid>().unwrap();

        // The largest count the extension-length field can express
        // still publishes a self-consistent buffer.
        let max: Vec<Sid> = (0..SRH_MAX_SEGMENTS).map(seg).collect();
        let id = store.create(max.clone(), 1).unwrap();
        let entry = store.get(id).unwrap();
        let (decoded, segments_left) = decode_srh(&entry.rewrite_bsid).unwrap();
        assert_eq!(decoded.len(), SRH_MAX_SEGMENTS);
        assert_eq!(segments_left as usize, SRH_MAX_SEGMENTS - 1);

        // One past the capacity is rejected before any buffer or
        // handle is built.
        let refs_before = provider.outstanding_refs();
        let over: Vec<Sid> = (0..SRH_MAX_SEGMENTS + 1).map(seg).collect();
        assert_eq!(
            store.create(over.clone(), 1),
            Err(SrError::SegmentListTooLong(SRH_MAX_SEGMENTS + 1))
        );
        assert_eq!(provider.outstanding_refs(), refs_before);

        // The same cap guards segment updates of an existing list.
        assert_eq!(
            store.update(id, Some(over), None),
            Err(SrError::SegmentListTooLong(SRH_MAX_SEGMENTS + 1))
        );
        assert_eq!(store.get(id).unwrap().segments, max);
    }

    #[test]
    fn test_create_rejects_zero_weight() {
        let (_, mut store) = new_store();
        assert_eq!(
            store.create(sids(&["fc00::1"]), 0),
            Err(SrError::InvalidWeight)
        );
    }

    #[test]
    fn test_update_segments_swaps_buffers() {
        let (_, mut store) = new_store();
        let id = store.create(sids(&["fc00::1"]), 1).unwrap();
        let old_buf = store.get(id).unwrap().rewrite(RewriteContext::Bsid);

        store
            .update(id, Some(sids(&["fc00::1", "fc00::2", "fc00::3"])), None)
            .unwrap();

        let entry = store.get(id).unwrap();
        let (decoded, segments_left) = decode_srh(&entry.rewrite_bsid).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(segments_left, 2);

        // The snapshot taken before the update is still self-consistent.
        let (old_decoded, old_left) = decode_srh(&old_buf).unwrap();
        assert_eq!(old_decoded.len(), 1);
        assert_eq!(old_left, 0);
    }

    #[test]
    fn test_update_weight_only() {
        let (_, mut store) = new_store();
        let id = store.create(sids(&["fc00::1"]), 1).unwrap();
        let buf_before = store.get(id).unwrap().rewrite(RewriteContext::Ip6Encap);

        store.update(id, None, Some(7)).unwrap();

        let entry = store.get(id).unwrap();
        assert_eq!(entry.weight, 7);
        // Weight change does not regenerate buffers.
        assert!(Arc::ptr_eq(&buf_before, &entry.rewrite_ip6));
    }

    #[test]
    fn test_release_frees_handles_and_recycles_index() {
        let (provider, mut store) = new_store();
        let id = store.create(sids(&["fc00::1"]), 1).unwrap();
        assert_eq!(provider.outstanding_refs(), 3);

        store.release(id).unwrap();
        assert_eq!(provider.outstanding_refs(), 0);
        assert!(store.get(id).is_none());

        let id2 = store.create(sids(&["fc00::2"]), 1).unwrap();
        assert_eq!(id2, id);
    }

    #[test]
    fn test_release_unknown() {
        let (_, mut store) = new_store();
        assert_eq!(store.release(5), Err(SrError::SidListNotFound(5)));
    }
}
