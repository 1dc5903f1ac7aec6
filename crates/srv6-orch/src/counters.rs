//! Per-object traffic counters.
//!
//! Each policy and LocalSID owns a valid/invalid counter pair. The
//! data path increments through a shared reference while the control
//! plane holds the table lock, so the cells are atomics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// One packet/byte counter cell.
#[derive(Debug, Default)]
pub struct CounterCell {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl CounterCell {
    pub fn increment(&self, bytes: u64) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.packets.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CounterSnapshot {
    pub packets: u64,
    pub bytes: u64,
}

/// Valid/invalid counter pair for one object slot.
#[derive(Debug, Default)]
pub struct CounterPair {
    pub valid: CounterCell,
    pub invalid: CounterCell,
}

impl CounterPair {
    pub fn reset(&self) {
        self.valid.reset();
        self.invalid.reset();
    }
}

/// Slab of counter pairs with recycled slots.
///
/// Slots are allocated when a policy or LocalSID is created and
/// released with it; a recycled slot starts from zero.
#[derive(Debug, Default)]
pub struct CounterSlab {
    slots: Vec<CounterPair>,
    free: Vec<usize>,
}

impl CounterSlab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_slot(&mut self) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].reset();
                slot
            }
            None => {
                self.slots.push(CounterPair::default());
                self.slots.len() - 1
            }
        }
    }

    pub fn release_slot(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.slots[slot].reset();
            self.free.push(slot);
        }
    }

    pub fn get(&self, slot: usize) -> Option<&CounterPair> {
        self.slots.get(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_snapshot() {
        let pair = CounterPair::default();
        pair.valid.increment(100);
        pair.valid.increment(60);
        pair.invalid.increment(40);

        assert_eq!(
            pair.valid.snapshot(),
            CounterSnapshot {
                packets: 2,
                bytes: 160
            }
        );
        assert_eq!(pair.invalid.snapshot().packets, 1);
    }

    #[test]
    fn test_slab_recycles_slots_zeroed() {
        let mut slab = CounterSlab::new();
        let a = slab.alloc_slot();
        slab.get(a).unwrap().valid.increment(100);

        slab.release_slot(a);
        let b = slab.alloc_slot();
        assert_eq!(b, a);
        assert_eq!(slab.get(b).unwrap().valid.snapshot().packets, 0);
    }
}
