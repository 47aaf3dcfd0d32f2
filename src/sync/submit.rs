//! Turning a compiled graph into an ordered sequence of queue submissions.

use std::sync::Arc;

use anyhow::Result;

use crate::core::device::Device;
use crate::sync::domain::QueueType;
use crate::sync::rental::{Pooled, RentedFence, RentedList};

/// A fence shared between the signalling and the waiting half of a cross-queue edge.
/// Both halves dropping returns the fence to its rental pool.
pub type SharedFence<D> = Arc<Pooled<RentedFence<D>>>;

/// One element of a queue's submission sequence.
pub enum SubmitItem<D: Device> {
    /// Execute a command list on this queue, ordered after the previous element.
    CommandList(Pooled<RentedList<D>>),
    /// Signal `fence` to `value` after all previously issued work on this queue.
    Signal { fence: SharedFence<D>, value: u64 },
    /// Block this queue (GPU-side) until `fence` reaches `value`.
    Wait { fence: SharedFence<D>, value: u64 },
}

/// One frame's ordered submissions for both queues.
///
/// Within one queue's sequence, execution order is exactly element order. Across
/// queues, ordering is exactly the set of signal/wait pairs the compiler inserted;
/// nothing else is implied or enforced.
pub struct SubmitSet<D: Device> {
    pub graphics: Vec<SubmitItem<D>>,
    pub compute: Vec<SubmitItem<D>>,
}

impl<D: Device> SubmitSet<D> {
    /// Create an empty submission set.
    pub fn new() -> Self {
        Self {
            graphics: Vec::new(),
            compute: Vec::new(),
        }
    }

    /// True if neither queue has elements.
    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty() && self.compute.is_empty()
    }

    /// The sequence for `queue`.
    pub fn queue_mut(&mut self, queue: QueueType) -> &mut Vec<SubmitItem<D>> {
        match queue {
            QueueType::Graphics => &mut self.graphics,
            QueueType::Compute => &mut self.compute,
        }
    }
}

impl<D: Device> Default for SubmitSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk both queue sequences in order and issue each element through the device.
///
/// Queue waits are enqueued on the GPU timeline and never block this walk, so draining
/// the graphics sequence completely before the compute sequence cannot deadlock even
/// when a wait's matching signal appears in the other sequence.
pub fn submit_command<D: Device>(device: &D, set: &mut SubmitSet<D>) -> Result<()> {
    for queue in [QueueType::Graphics, QueueType::Compute] {
        let sequence = match queue {
            QueueType::Graphics => &mut set.graphics,
            QueueType::Compute => &mut set.compute,
        };
        for item in sequence.iter_mut() {
            match item {
                SubmitItem::CommandList(list) => {
                    debug_assert_eq!(list.queue, queue, "command list sequenced on the wrong queue");
                    device.execute(queue, &mut list.list)?;
                }
                SubmitItem::Signal { fence, value } => {
                    device.queue_signal(queue, fence.fence(), *value)?;
                }
                SubmitItem::Wait { fence, value } => {
                    device.queue_wait(queue, fence.fence(), *value)?;
                }
            }
        }
    }
    Ok(())
}
