//! Rental pools for frame-scoped GPU objects: fences and command lists.
//!
//! Rented objects hand themselves back to their pool when dropped, so a
//! [`SubmitSet`](crate::sync::submit::SubmitSet) going out of scope automatically
//! recycles every fence and command list it referenced. Release and rent can happen on
//! different threads; the free list is a lock-free stack so neither side ever blocks
//! the other.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use anyhow::Result;

use crate::core::device::Device;
use crate::sync::domain::QueueType;
use crate::util::lockfree_stack::LockFreeStack;

/// Indicates that this object can be rented from a [`Pool`].
pub trait Poolable {
    /// Called right before the object is released back to the pool, can be used to
    /// reset internal state.
    fn on_release(&mut self);
}

type BoxedCreateFn<P> = Box<dyn Fn() -> Result<P> + Send + Sync>;

struct PoolShared<P: Poolable> {
    free: LockFreeStack<P>,
    create_fn: BoxedCreateFn<P>,
}

/// An object pool that can be rented from on any thread. If the free list is empty,
/// a new object is allocated through the creation callback.
pub struct Pool<P: Poolable> {
    shared: Arc<PoolShared<P>>,
}

impl<P: Poolable> Clone for Pool<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P: Poolable> Pool<P> {
    /// Create a new pool. This must be supplied with a callback to be called when the
    /// pool needs to allocate a new object. Optionally preallocates a number of objects
    /// using this callback.
    pub fn new(
        create_fn: impl Fn() -> Result<P> + Send + Sync + 'static,
        preallocate: usize,
    ) -> Result<Self> {
        let create_fn: BoxedCreateFn<P> = Box::new(create_fn);
        let free = LockFreeStack::new();
        for _ in 0..preallocate {
            free.push(create_fn()?);
        }
        Ok(Self {
            shared: Arc::new(PoolShared { free, create_fn }),
        })
    }

    /// Rent an object from the pool.
    pub fn rent(&self) -> Result<Pooled<P>> {
        let item = match self.shared.free.pop() {
            Some(item) => item,
            None => (self.shared.create_fn)()?,
        };
        Ok(Pooled {
            item: Some(item),
            pool: self.clone(),
        })
    }
}

/// A rented object. When this is dropped, it's released back to the pool where it can
/// be rented again immediately.
pub struct Pooled<P: Poolable> {
    item: Option<P>,
    pool: Pool<P>,
}

impl<P: Poolable> Deref for Pooled<P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.item.as_ref().unwrap()
    }
}

impl<P: Poolable> DerefMut for Pooled<P> {
    fn deref_mut(&mut self) -> &mut P {
        self.item.as_mut().unwrap()
    }
}

impl<P: Poolable> Drop for Pooled<P> {
    fn drop(&mut self) {
        let mut item = self.item.take().unwrap();
        item.on_release();
        // push() creates a fresh node, satisfying the stack's ownership contract
        self.pool.shared.free.push(item);
    }
}

/// A fence rented for cross-queue signal/wait pairs. The value counter is monotonic
/// across rentals, so a reused fence can never be confused with an already-signaled
/// value from a previous frame.
pub struct RentedFence<D: Device> {
    pub(crate) fence: D::Fence,
    next_value: u64,
}

impl<D: Device> RentedFence<D> {
    fn new(device: &D) -> Result<Self> {
        Ok(Self {
            fence: device.create_fence()?,
            next_value: 1,
        })
    }

    /// Reserve the next signal value on this fence.
    pub(crate) fn advance(&mut self) -> u64 {
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    /// The underlying fence object.
    pub fn fence(&self) -> &D::Fence {
        &self.fence
    }
}

impl<D: Device> Poolable for RentedFence<D> {
    fn on_release(&mut self) {}
}

/// A command list rented for a single frame. Valid only until the frame that rented it
/// retires; raw list identity never crosses a frame boundary.
pub struct RentedList<D: Device> {
    pub(crate) list: D::CommandList,
    pub(crate) queue: QueueType,
}

impl<D: Device> RentedList<D> {
    /// The queue this list records for.
    pub fn queue(&self) -> QueueType {
        self.queue
    }
}

impl<D: Device> Poolable for RentedList<D> {
    fn on_release(&mut self) {}
}

/// All rental pools, with command-list pools kept as a registry tagged by queue type
/// behind one rent interface.
pub struct RentalPools<D: Device> {
    fences: Pool<RentedFence<D>>,
    lists: HashMap<QueueType, Pool<RentedList<D>>>,
}

impl<D: Device> Clone for RentalPools<D> {
    fn clone(&self) -> Self {
        Self {
            fences: self.fences.clone(),
            lists: self.lists.clone(),
        }
    }
}

impl<D: Device> RentalPools<D> {
    /// Create the rental pools for `device`.
    pub fn new(device: &D) -> Result<Self> {
        let fences = {
            let device = device.clone();
            Pool::new(move || RentedFence::new(&device), 0)?
        };
        let mut lists = HashMap::new();
        for queue in [QueueType::Graphics, QueueType::Compute] {
            let device = device.clone();
            lists.insert(
                queue,
                Pool::new(
                    move || {
                        Ok(RentedList {
                            list: device.create_command_list(queue)?,
                            queue,
                        })
                    },
                    0,
                )?,
            );
        }
        Ok(Self { fences, lists })
    }

    /// Rent a fence.
    pub fn rent_fence(&self) -> Result<Pooled<RentedFence<D>>> {
        self.fences.rent()
    }

    /// Rent a command list for `queue`.
    pub fn rent_list(&self, queue: QueueType) -> Result<Pooled<RentedList<D>>> {
        self.lists
            .get(&queue)
            .expect("list pool registry covers every queue type")
            .rent()
    }
}
