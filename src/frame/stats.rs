//! Per-frame timing statistics.

use crate::util::ring_buffer::RingBuffer;

/// Timings of one frame, in microseconds. A record is complete only once the render
/// thread has reported its half of the numbers back.
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameTiming {
    /// Time spent inside the application render callback.
    pub app_callback_us: u64,
    /// Time the application thread spent waiting on the render thread.
    pub wait_render_us: u64,
    /// Time the render thread spent waiting on the GPU fence before reusing a slot.
    pub wait_gpu_us: u64,
    /// Time spent in present.
    pub present_us: u64,
    /// Set once the render thread has reported back.
    pub complete: bool,
}

/// Fixed-depth history of frame timings, indexed from the most recent frame.
pub struct FrameStats {
    ring: RingBuffer<FrameTiming>,
}

impl FrameStats {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            ring: RingBuffer::new(depth),
        }
    }

    pub(crate) fn push(&mut self, timing: FrameTiming) {
        self.ring.push(timing);
    }

    pub(crate) fn latest_mut(&mut self) -> Option<&mut FrameTiming> {
        self.ring.get_mut(0)
    }

    /// The record `age` frames back; `frame(0)` is the most recent frame.
    pub fn frame(&self, age: usize) -> Option<&FrameTiming> {
        self.ring.get(age)
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True if no frame has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
