//! Deferred render commands, double-buffered so producers never block on drain.
//!
//! Any thread may queue a closure that records into the next render dispatch's system
//! command list. On each dispatch the two buffers are flipped: the pending buffer
//! becomes the executing buffer and a fresh pending buffer takes its place. The
//! executing buffer is drained without holding the producer lock, so producers never
//! wait on drain and drain never observes a partially written buffer.

use std::sync::Mutex;

use crate::core::device::Device;

type DeferredFn<D> = Box<dyn FnOnce(&D, &mut <D as Device>::CommandList) + Send>;

/// Double-buffered queue of render commands deferred to the next dispatch.
pub struct DeferredCommandQueue<D: Device> {
    pending: Mutex<Vec<DeferredFn<D>>>,
    // Only the render thread touches this buffer, the lock is uncontended.
    executing: Mutex<Vec<DeferredFn<D>>>,
}

impl<D: Device> DeferredCommandQueue<D> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            executing: Mutex::new(Vec::new()),
        }
    }

    /// Queue a command from any thread. It runs exactly once, in push order, at the
    /// start of the next render dispatch.
    pub fn push(&self, f: impl FnOnce(&D, &mut D::CommandList) + Send + 'static) {
        self.pending.lock().unwrap().push(Box::new(f));
    }

    /// Number of commands waiting for the next dispatch.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Swap the pending and executing buffers. Called once per dispatch, before
    /// [`drain`](DeferredCommandQueue::drain).
    pub(crate) fn flip(&self) {
        let mut pending = self.pending.lock().unwrap();
        let mut executing = self.executing.lock().unwrap();
        debug_assert!(executing.is_empty(), "drain must run between flips");
        std::mem::swap(&mut *pending, &mut *executing);
    }

    /// Run every command captured by the last flip, in push order. The producer lock
    /// is not held while commands execute.
    pub(crate) fn drain(&self, device: &D, cmd: &mut D::CommandList) {
        let commands = std::mem::take(&mut *self.executing.lock().unwrap());
        for f in commands {
            f(device, cmd);
        }
    }
}

impl<D: Device> Default for DeferredCommandQueue<D> {
    fn default() -> Self {
        Self::new()
    }
}
