//! Bounded tracking of GPU work that has been submitted but not yet observed complete.

use anyhow::Result;

use crate::core::device::Device;
use crate::sync::submit::SubmitSet;

struct InFlightSlot<D: Device> {
    fence_value: u64,
    valid: bool,
    // Submissions whose rented objects must stay out of the pools until the GPU
    // passes `fence_value`.
    retired: Vec<SubmitSet<D>>,
}

/// Fixed-size circular set of in-flight frame slots. Before a slot is reused, the CPU
/// blocks until the fence value recorded in it has been reached, which bounds how many
/// frames of GPU work can be outstanding.
pub struct InFlightSlots<D: Device> {
    slots: Vec<InFlightSlot<D>>,
    cursor: usize,
    next_value: u64,
}

impl<D: Device> InFlightSlots<D> {
    /// Create `count` slots; `count` must cover at least the swap chain's back buffers.
    pub fn new(count: usize) -> Self {
        assert!(count >= 1, "at least one in-flight slot is required");
        Self {
            slots: (0..count)
                .map(|_| InFlightSlot {
                    fence_value: 0,
                    valid: false,
                    retired: Vec::new(),
                })
                .collect(),
            cursor: 0,
            next_value: 0,
        }
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Reserve the fence value the next [`publish`](InFlightSlots::publish) will record.
    pub fn next_value(&mut self) -> u64 {
        self.next_value += 1;
        self.next_value
    }

    /// Block until the slot about to be reused is free, then release the work it held.
    pub fn wait_reuse(&mut self, device: &D, fence: &D::Fence) -> Result<()> {
        let slot = &mut self.slots[self.cursor];
        if slot.valid {
            device.wait_fence(fence, slot.fence_value)?;
            slot.valid = false;
        }
        slot.retired.clear();
        Ok(())
    }

    /// Record a submission completing at `value` into the current slot and advance.
    pub fn publish(&mut self, value: u64, retired: Vec<SubmitSet<D>>) {
        let slot = &mut self.slots[self.cursor];
        debug_assert!(!slot.valid, "publishing into a slot that was not reclaimed");
        slot.fence_value = value;
        slot.valid = true;
        slot.retired = retired;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Block until every outstanding slot has completed. Used at shutdown.
    pub fn wait_all(&mut self, device: &D, fence: &D::Fence) -> Result<()> {
        for slot in self.slots.iter_mut() {
            if slot.valid {
                device.wait_fence(fence, slot.fence_value)?;
                slot.valid = false;
            }
            slot.retired.clear();
        }
        Ok(())
    }
}
