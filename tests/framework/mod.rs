#![allow(dead_code)]

//! Shared mock device driving the integration tests. It implements the full device
//! boundary, records every primitive it is driven through in call order, and
//! "completes" GPU work instantly: a queue signal makes the fence reach its value
//! immediately, and a CPU wait on a value that was never signaled fails loudly
//! instead of deadlocking the test.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use deimos::prelude::*;

/// One recorded device primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOp {
    CreateTexture {
        texture: u64,
    },
    Begin {
        list: u64,
    },
    End {
        list: u64,
    },
    Barrier {
        texture: u64,
        before: ResourceState,
        after: ResourceState,
    },
    Execute {
        queue: QueueType,
        list: u64,
    },
    Signal {
        queue: QueueType,
        fence: u64,
        value: u64,
    },
    QueueWait {
        queue: QueueType,
        fence: u64,
        value: u64,
    },
    FenceWait {
        fence: u64,
        value: u64,
    },
    Present,
    Note(&'static str),
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: u64,
    pub desc: ResourceDesc,
}

#[derive(Debug)]
pub struct MockView {
    pub texture: u64,
    pub kind: ViewKind,
}

#[derive(Debug)]
pub struct MockList {
    pub id: u64,
    pub queue: QueueType,
    pub open: bool,
}

#[derive(Debug)]
pub struct MockFence {
    pub id: u64,
    value: AtomicU64,
}

#[derive(Debug)]
pub struct MockSwapchain {
    pub back_buffers: usize,
}

#[derive(Debug, Default)]
struct MockInner {
    ops: Mutex<Vec<DeviceOp>>,
    next_id: AtomicU64,
    fail_next_alloc: AtomicBool,
}

/// Mock implementation of the device boundary.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    inner: Arc<MockInner>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn log(&self, op: DeviceOp) {
        self.inner.ops.lock().unwrap().push(op);
    }

    /// Everything the device was driven through so far, in call order.
    pub fn ops(&self) -> Vec<DeviceOp> {
        self.inner.ops.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.inner.ops.lock().unwrap().clear();
    }

    /// Record a marker; pass executors and deferred commands use this to make their
    /// execution order observable.
    pub fn note(&self, marker: &'static str) {
        self.log(DeviceOp::Note(marker));
    }

    /// Make the next texture allocation fail.
    pub fn fail_next_allocation(&self) {
        self.inner.fail_next_alloc.store(true, Ordering::Relaxed);
    }

    pub fn count(&self, pred: impl Fn(&DeviceOp) -> bool) -> usize {
        self.ops().iter().filter(|op| pred(op)).count()
    }

    /// Position of the first op matching `pred`.
    pub fn position(&self, pred: impl Fn(&DeviceOp) -> bool) -> Option<usize> {
        self.ops().iter().position(|op| pred(op))
    }

    /// All recorded barriers as `(texture, before, after)`.
    pub fn barriers(&self) -> Vec<(u64, ResourceState, ResourceState)> {
        self.ops()
            .iter()
            .filter_map(|op| match op {
                DeviceOp::Barrier {
                    texture,
                    before,
                    after,
                } => Some((*texture, *before, *after)),
                _ => None,
            })
            .collect()
    }
}

impl Device for MockDevice {
    type Texture = MockTexture;
    type View = MockView;
    type CommandList = MockList;
    type Fence = MockFence;
    type Swapchain = MockSwapchain;

    fn create_texture(&self, desc: &ResourceDesc) -> Result<MockTexture> {
        if self.inner.fail_next_alloc.swap(false, Ordering::Relaxed) {
            bail!("mock device out of memory");
        }
        let id = self.next_id();
        self.log(DeviceOp::CreateTexture { texture: id });
        Ok(MockTexture { id, desc: *desc })
    }

    fn create_view(&self, texture: &MockTexture, kind: ViewKind) -> Result<MockView> {
        Ok(MockView {
            texture: texture.id,
            kind,
        })
    }

    fn create_command_list(&self, queue: QueueType) -> Result<MockList> {
        Ok(MockList {
            id: self.next_id(),
            queue,
            open: false,
        })
    }

    fn create_fence(&self) -> Result<MockFence> {
        Ok(MockFence {
            id: self.next_id(),
            value: AtomicU64::new(0),
        })
    }

    fn begin_command_list(&self, cmd: &mut MockList) -> Result<()> {
        assert!(!cmd.open, "begin on a list that is already recording");
        cmd.open = true;
        self.log(DeviceOp::Begin { list: cmd.id });
        Ok(())
    }

    fn end_command_list(&self, cmd: &mut MockList) -> Result<()> {
        assert!(cmd.open, "end on a list that is not recording");
        cmd.open = false;
        self.log(DeviceOp::End { list: cmd.id });
        Ok(())
    }

    fn cmd_resource_barrier(
        &self,
        cmd: &mut MockList,
        texture: &MockTexture,
        before: ResourceState,
        after: ResourceState,
    ) {
        assert!(cmd.open, "barrier recorded outside begin/end");
        self.log(DeviceOp::Barrier {
            texture: texture.id,
            before,
            after,
        });
    }

    fn execute(&self, queue: QueueType, cmd: &mut MockList) -> Result<()> {
        assert!(!cmd.open, "executing a list that was not closed");
        assert_eq!(cmd.queue, queue, "list executed on the wrong queue");
        self.log(DeviceOp::Execute {
            queue,
            list: cmd.id,
        });
        Ok(())
    }

    fn queue_signal(&self, queue: QueueType, fence: &MockFence, value: u64) -> Result<()> {
        // the mock GPU completes instantly
        fence.value.fetch_max(value, Ordering::SeqCst);
        self.log(DeviceOp::Signal {
            queue,
            fence: fence.id,
            value,
        });
        Ok(())
    }

    fn queue_wait(&self, queue: QueueType, fence: &MockFence, value: u64) -> Result<()> {
        self.log(DeviceOp::QueueWait {
            queue,
            fence: fence.id,
            value,
        });
        Ok(())
    }

    fn wait_fence(&self, fence: &MockFence, value: u64) -> Result<()> {
        if fence.value.load(Ordering::SeqCst) < value {
            bail!("wait on fence value {value} that was never signaled; the test would deadlock");
        }
        self.log(DeviceOp::FenceWait {
            fence: fence.id,
            value,
        });
        Ok(())
    }

    fn fence_completed_value(&self, fence: &MockFence) -> u64 {
        fence.value.load(Ordering::SeqCst)
    }

    fn back_buffer_count(&self, swapchain: &MockSwapchain) -> usize {
        swapchain.back_buffers
    }

    fn present(&self, _swapchain: &MockSwapchain) -> Result<()> {
        self.log(DeviceOp::Present);
        Ok(())
    }
}

/// A pass executor that records a marker through the device when the pass records.
pub struct NoteExecutor(pub &'static str);

impl PassExecutor<MockDevice> for NoteExecutor {
    fn execute(&mut self, pass: &mut PassContext<'_, MockDevice>) -> Result<()> {
        pass.device().note(self.0);
        Ok(())
    }
}

/// Creates a mock device and a graph manager ready for automated tests.
pub fn make_manager() -> (MockDevice, GraphManager<MockDevice>) {
    make_manager_with_settings(CoreSettings::default())
}

/// Same, with explicit settings.
pub fn make_manager_with_settings(
    settings: CoreSettings,
) -> (MockDevice, GraphManager<MockDevice>) {
    let _ = pretty_env_logger::try_init();
    let device = MockDevice::new();
    let manager = GraphManager::new(device.clone(), &settings).unwrap();
    (device, manager)
}
