//! Re-exports the most commonly used types of the crate.

pub use crate::core::device::{Device, ViewKind};
pub use crate::core::error::Error;
pub use crate::core::settings::{CoreSettings, SettingsBuilder};
pub use crate::frame::stats::{FrameStats, FrameTiming};
pub use crate::frame::{FrameManager, RenderCommandQueue, RenderFrameContext};
pub use crate::graph::compiler::{CompiledGraph, RenderTaskGraph};
pub use crate::graph::manager::GraphManager;
pub use crate::graph::pass::{
    EmptyPassExecutor, Pass, PassAccess, PassBuilder, PassContext, PassExecutor, PassResources,
};
pub use crate::graph::stage::TaskStage;
pub use crate::graph::viz::GraphViz;
pub use crate::resource::descriptor::{PixelFormat, ResourceDesc};
pub use crate::resource::handle::ResourceHandle;
pub use crate::resource::pool::{InstanceKey, PooledResource, ResourcePool};
pub use crate::resource::state::{ResourceAccess, ResourceState};
pub use crate::sync::deferred::DeferredCommandQueue;
pub use crate::sync::domain::{Compute, ExecutionDomain, Graphics, QueueType};
pub use crate::sync::in_flight::InFlightSlots;
pub use crate::sync::render_thread::RenderThread;
pub use crate::sync::rental::{Pool, Poolable, Pooled, RentalPools, RentedFence, RentedList};
pub use crate::sync::submit::{submit_command, SharedFence, SubmitItem, SubmitSet};
pub use crate::util::lockfree_stack::LockFreeStack;
pub use crate::util::ring_buffer::RingBuffer;
