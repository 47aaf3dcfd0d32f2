//! The native device boundary.
//!
//! The core never binds a graphics API directly. Everything it needs from one is the
//! narrow set of primitives below: command list begin/end, resource barriers with
//! explicit pre/post states, ordered queue execution, fence signal/wait with
//! monotonically increasing values, and present. A backend implements [`Device`] once
//! and the whole crate drives it; the test suite ships a mock implementation and a real
//! renderer supplies its Vulkan or D3D12 binding.
//!
//! Implementations are expected to be cheap, cloneable handles (internally reference
//! counted), following the same shape as an allocator or device wrapper in any native
//! binding layer.

use std::fmt::Debug;

use anyhow::Result;

use crate::resource::descriptor::ResourceDesc;
use crate::resource::state::ResourceState;
use crate::sync::domain::QueueType;

/// Which view of a texture to create or look up.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ViewKind {
    /// Shader-read view.
    Read,
    /// Unordered-access (read/write) view.
    Write,
    /// Render-target or depth-target view, depending on the texture format.
    Target,
}

/// The opaque primitives the core requires from a native graphics binding.
///
/// Semantics the core relies on:
/// - Work executed on one queue runs in execution order.
/// - [`queue_signal`](Device::queue_signal) makes the fence reach `value` after all
///   previously executed work on that queue completes.
/// - [`queue_wait`](Device::queue_wait) blocks further work on that queue (GPU-side,
///   never the CPU) until the fence reaches `value`.
/// - [`wait_fence`](Device::wait_fence) blocks the calling thread, with no timeout,
///   until the fence reaches `value`.
pub trait Device: Clone + Send + Sync + 'static {
    /// Texture object owned by the backend.
    type Texture: Send + Sync + Debug;
    /// Texture view object owned by the backend.
    type View: Send + Sync + Debug;
    /// Command list object owned by the backend.
    type CommandList: Send + Debug;
    /// Fence object carrying a monotonically increasing 64-bit value.
    type Fence: Send + Sync + Debug;
    /// Swap chain object owned by the platform glue.
    type Swapchain: Send + Sync + Debug;

    /// Allocate a 2D texture matching `desc`.
    fn create_texture(&self, desc: &ResourceDesc) -> Result<Self::Texture>;
    /// Create a view of `texture`. Backends may reject view kinds a format cannot
    /// support; the pool only requests kinds consistent with the descriptor.
    fn create_view(&self, texture: &Self::Texture, kind: ViewKind) -> Result<Self::View>;
    /// Create a command list recording for `queue`.
    fn create_command_list(&self, queue: QueueType) -> Result<Self::CommandList>;
    /// Create a fence with its value at zero.
    fn create_fence(&self) -> Result<Self::Fence>;

    /// Open a command list for recording. Also resets a previously executed list.
    fn begin_command_list(&self, cmd: &mut Self::CommandList) -> Result<()>;
    /// Close a command list; it must be closed before execution.
    fn end_command_list(&self, cmd: &mut Self::CommandList) -> Result<()>;
    /// Record a resource state transition into `cmd`.
    fn cmd_resource_barrier(
        &self,
        cmd: &mut Self::CommandList,
        texture: &Self::Texture,
        before: ResourceState,
        after: ResourceState,
    );

    /// Execute a closed command list on `queue`, ordered after all work previously
    /// executed on that queue.
    fn execute(&self, queue: QueueType, cmd: &mut Self::CommandList) -> Result<()>;
    /// Signal `fence` to `value` on `queue` after all previously issued work.
    fn queue_signal(&self, queue: QueueType, fence: &Self::Fence, value: u64) -> Result<()>;
    /// Make `queue` wait (GPU-side) until `fence` reaches `value`.
    fn queue_wait(&self, queue: QueueType, fence: &Self::Fence, value: u64) -> Result<()>;

    /// Block the calling thread until `fence` reaches `value`. No timeout.
    fn wait_fence(&self, fence: &Self::Fence, value: u64) -> Result<()>;
    /// The last value `fence` is known to have reached.
    fn fence_completed_value(&self, fence: &Self::Fence) -> u64;

    /// Number of back buffers in the swap chain.
    fn back_buffer_count(&self, swapchain: &Self::Swapchain) -> usize;
    /// Present the swap chain's current back buffer.
    fn present(&self, swapchain: &Self::Swapchain) -> Result<()>;
}
