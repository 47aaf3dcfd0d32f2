//! This module mainly exposes the [`PassBuilder`] struct, used for correctly defining
//! passes in a [`RenderTaskGraph`](crate::graph::compiler::RenderTaskGraph).
//!
//! Each pass declares the resources it accesses and the kind of access, and registers
//! a callback invoked when the pass is recorded. Declaring accesses is what drives
//! automatic state resolution: the compiler transitions each resource to the declared
//! state right before the pass's command list runs, and inserts cross-queue fences
//! where a hazard spans queue types.
//!
//! A pass is always created for a concrete queue domain, either [`PassBuilder::graphics`] or
//! [`PassBuilder::compute`]; there is no way to construct the underlying node without
//! one. Both domains get identical scheduling treatment.
//!
//! # Example
//!
//! A graphics pass writing an offscreen target, and a compute pass reading it:
//! ```ignore
//! use deimos::prelude::*;
//!
//! let mut graph = RenderTaskGraph::new();
//! let color = graph.texture(ResourceDesc::new(1920, 1080, PixelFormat::Rgba16Float));
//!
//! graph.add_pass(
//!     PassBuilder::graphics("offscreen")
//!         .render_target(color)
//!         .executor(move |pass: &mut PassContext<'_, _>| {
//!             // record draws into pass.command_list(0)
//!             Ok(())
//!         })
//!         .build(),
//! );
//! graph.add_pass(
//!     PassBuilder::compute("post")
//!         .shader_read(color)
//!         .executor(move |pass: &mut PassContext<'_, _>| Ok(()))
//!         .build(),
//! );
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use anyhow::Result;

use crate::core::device::{Device, ViewKind};
use crate::resource::handle::ResourceHandle;
use crate::resource::pool::{InstanceKey, ResourcePool};
use crate::resource::state::{ResourceAccess, ResourceState};
use crate::sync::domain::{Compute, ExecutionDomain, Graphics, QueueType};
use crate::sync::rental::{Pooled, RentedList};

/// A single declared resource access.
#[derive(Copy, Clone, Debug)]
pub struct PassAccess {
    pub handle: ResourceHandle,
    pub access: ResourceAccess,
}

/// Read-only view of the resources a compile resolved, handed to pass executors.
pub struct PassResources<'a, D: Device> {
    pub(crate) pool: &'a ResourcePool<D>,
    pub(crate) resolved: &'a HashMap<ResourceHandle, InstanceKey>,
}

impl<'a, D: Device> PassResources<'a, D> {
    fn instance(&self, handle: ResourceHandle) -> &'a crate::resource::pool::PooledResource<D> {
        let key = self
            .resolved
            .get(&handle)
            .copied()
            .unwrap_or_else(|| panic!("{:?} was not declared by this graph", handle));
        self.pool.get(key)
    }

    /// The texture a handle resolved to.
    pub fn texture(&self, handle: ResourceHandle) -> &'a std::sync::Arc<D::Texture> {
        self.instance(handle).texture()
    }

    /// A view of the texture a handle resolved to.
    pub fn view(&self, handle: ResourceHandle, kind: ViewKind) -> &'a D::View {
        self.instance(handle).view(kind)
    }

    /// The state the compile left the resource in.
    pub fn state(&self, handle: ResourceHandle) -> ResourceState {
        self.instance(handle).current_state()
    }
}

/// Context handed to a pass executor while its node records.
pub struct PassContext<'a, D: Device> {
    pub(crate) device: &'a D,
    pub(crate) lists: &'a mut [Pooled<RentedList<D>>],
    pub(crate) resources: PassResources<'a, D>,
}

impl<'a, D: Device> PassContext<'a, D> {
    /// The `index`-th command list this pass requested. Index 0 always exists and
    /// already carries the pass's pre-transition barriers.
    pub fn command_list(&mut self, index: usize) -> &mut D::CommandList {
        &mut self.lists[index].list
    }

    /// Number of command lists this pass requested.
    pub fn command_list_count(&self) -> usize {
        self.lists.len()
    }

    /// The device, for recording backend commands.
    pub fn device(&self) -> &'a D {
        self.device
    }

    /// The resolved resources this pass declared.
    pub fn resources(&self) -> &PassResources<'a, D> {
        &self.resources
    }
}

/// Defines a pass executor that can be called when the pass is recorded.
pub trait PassExecutor<D: Device> {
    /// Record this pass into its command lists.
    fn execute(&mut self, pass: &mut PassContext<'_, D>) -> Result<()>;
}

impl<D: Device, F> PassExecutor<D> for F
where
    F: FnMut(&mut PassContext<'_, D>) -> Result<()>,
{
    fn execute(&mut self, pass: &mut PassContext<'_, D>) -> Result<()> {
        self(pass)
    }
}

pub(crate) type BoxedPassFn<'cb, D> = Box<dyn PassExecutor<D> + Send + 'cb>;

/// An empty pass executor that does nothing. Useful for passes that only exist to
/// force resource transitions.
pub struct EmptyPassExecutor;

impl EmptyPassExecutor {
    /// Creates an empty pass executor
    pub fn new() -> Self {
        Self {}
    }

    /// Create a new empty pass executor in a [`Box`]
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self::new())
    }
}

impl Default for EmptyPassExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> PassExecutor<D> for EmptyPassExecutor {
    fn execute(&mut self, _pass: &mut PassContext<'_, D>) -> Result<()> {
        Ok(())
    }
}

/// One unit of work in a task graph, tied to the queue domain it was built for. You
/// can obtain one using a [`PassBuilder`]; the node type itself cannot be constructed
/// directly.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Pass<'cb, Q: ExecutionDomain, D: Device> {
    pub(crate) name: String,
    pub(crate) accesses: Vec<PassAccess>,
    pub(crate) list_count: usize,
    #[derivative(Debug = "ignore")]
    pub(crate) execute: BoxedPassFn<'cb, D>,
    pub(crate) _domain: PhantomData<Q>,
}

impl<'cb, Q: ExecutionDomain, D: Device> Pass<'cb, Q, D> {
    /// Get the pass name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accesses this pass declared.
    pub fn accesses(&self) -> &[PassAccess] {
        &self.accesses
    }
}

/// Used to create [`Pass`] objects correctly.
/// # Example
/// See the [`pass`](crate::graph::pass) module level documentation.
pub struct PassBuilder<'cb, Q: ExecutionDomain, D: Device> {
    inner: Pass<'cb, Q, D>,
}

impl<'cb, Q: ExecutionDomain, D: Device> PassBuilder<'cb, Q, D> {
    fn with_domain(name: impl Into<String>) -> Self {
        PassBuilder {
            inner: Pass {
                name: name.into(),
                accesses: Vec::new(),
                list_count: 1,
                execute: EmptyPassExecutor::new_boxed(),
                _domain: PhantomData,
            },
        }
    }

    fn access(mut self, handle: ResourceHandle, access: ResourceAccess) -> Self {
        assert!(handle.is_valid(), "declared access on the invalid handle");
        self.inner.accesses.push(PassAccess { handle, access });
        self
    }

    /// Declare that this pass samples `handle` in a shader.
    pub fn shader_read(self, handle: ResourceHandle) -> Self {
        self.access(handle, ResourceAccess::ShaderRead)
    }

    /// Declare that this pass reads and writes `handle` through an unordered-access
    /// view.
    pub fn unordered_access(self, handle: ResourceHandle) -> Self {
        self.access(handle, ResourceAccess::UnorderedAccess)
    }

    /// Request `count` command lists for this pass instead of the default single one.
    pub fn command_lists(mut self, count: usize) -> Self {
        assert!(count >= 1, "a pass records into at least one command list");
        self.inner.list_count = count;
        self
    }

    /// Set the executor to be called when recording this pass.
    pub fn executor(mut self, exec: impl PassExecutor<D> + Send + 'cb) -> Self {
        self.inner.execute = Box::new(exec);
        self
    }

    /// Obtain a built [`Pass`] object.
    pub fn build(self) -> Pass<'cb, Q, D> {
        self.inner
    }
}

impl<'cb, D: Device> PassBuilder<'cb, Graphics, D> {
    /// Create a new pass executing on the graphics queue.
    pub fn graphics(name: impl Into<String>) -> Self {
        Self::with_domain(name)
    }

    /// Declare that this pass renders to `handle` as a color target.
    pub fn render_target(self, handle: ResourceHandle) -> Self {
        self.access(handle, ResourceAccess::RenderTarget)
    }

    /// Declare that this pass writes depth to `handle`.
    pub fn depth_target(self, handle: ResourceHandle) -> Self {
        self.access(handle, ResourceAccess::DepthTarget)
    }
}

impl<'cb, D: Device> PassBuilder<'cb, Compute, D> {
    /// Create a new pass executing on the async compute queue.
    pub fn compute(name: impl Into<String>) -> Self {
        Self::with_domain(name)
    }
}

/// The type-erased node record the compiler schedules. Both queue domains share this
/// representation and get identical treatment.
pub(crate) struct PassNode<'cb, D: Device> {
    pub(crate) name: String,
    pub(crate) queue: QueueType,
    pub(crate) accesses: Vec<PassAccess>,
    pub(crate) list_count: usize,
    pub(crate) execute: BoxedPassFn<'cb, D>,
}
