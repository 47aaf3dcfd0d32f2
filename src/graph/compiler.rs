//! Building and compiling one frame's render task graph.
//!
//! The graph is a flat, registration-ordered list of passes. Compilation performs no
//! reordering and no parallel scheduling; it resolves every declared resource access
//! against the pool, plans the state transitions that must precede each pass's command
//! list, and inserts a fence signal/wait pair wherever a hazard spans queue types.
//! Execution then records each pass through its callback and assembles the ordered
//! [`SubmitSet`] for both queues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;

use crate::core::device::Device;
use crate::core::error::Error;
use crate::graph::pass::{BoxedPassFn, Pass, PassAccess, PassContext, PassNode, PassResources};
use crate::graph::stage::TaskStage;
use crate::resource::descriptor::ResourceDesc;
use crate::resource::handle::ResourceHandle;
use crate::resource::pool::{InstanceKey, ResourcePool};
use crate::resource::state::ResourceState;
use crate::sync::domain::{ExecutionDomain, QueueType};
use crate::sync::rental::RentalPools;
use crate::sync::submit::{SharedFence, SubmitItem, SubmitSet};

enum ResourceDecl<D: Device> {
    Transient(ResourceDesc),
    External {
        texture: Arc<D::Texture>,
        desc: ResourceDesc,
        state_begin: ResourceState,
        state_end: ResourceState,
    },
}

/// One frame's render task graph under construction.
///
/// Declare resources with [`texture`](RenderTaskGraph::texture) and
/// [`import`](RenderTaskGraph::import), then append passes in the order they must
/// execute. The graph is consumed by [`GraphManager::compile`](crate::graph::manager::GraphManager::compile).
pub struct RenderTaskGraph<'cb, D: Device> {
    nodes: Vec<PassNode<'cb, D>>,
    decls: HashMap<ResourceHandle, ResourceDecl<D>>,
    next_id: u64,
}

impl<'cb, D: Device> RenderTaskGraph<'cb, D> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            decls: HashMap::new(),
            // id zero stays reserved invalid
            next_id: 1,
        }
    }

    /// Declare a transient 2D texture for this compile. The concrete pooled instance
    /// is resolved when the graph compiles; two handles declared with bit-equal
    /// descriptors resolve to the same instance.
    pub fn texture(&mut self, desc: ResourceDesc) -> ResourceHandle {
        let handle = ResourceHandle::new_internal(self.next_id);
        self.next_id += 1;
        self.decls.insert(handle, ResourceDecl::Transient(desc));
        handle
    }

    /// Import a caller-owned resource for this compile. It enters the compile in
    /// `state_begin` and is guaranteed to be left in `state_end` when the compiled
    /// frame finishes.
    pub fn import(
        &mut self,
        texture: Arc<D::Texture>,
        desc: ResourceDesc,
        state_begin: ResourceState,
        state_end: ResourceState,
    ) -> ResourceHandle {
        self.import_inner(texture, desc, state_begin, state_end, false)
    }

    /// Import the swap chain back buffer. Its trailing transition always executes on
    /// the graphics queue, which is the presenting queue.
    pub fn import_swapchain(
        &mut self,
        texture: Arc<D::Texture>,
        desc: ResourceDesc,
        state_begin: ResourceState,
        state_end: ResourceState,
    ) -> ResourceHandle {
        self.import_inner(texture, desc, state_begin, state_end, true)
    }

    fn import_inner(
        &mut self,
        texture: Arc<D::Texture>,
        desc: ResourceDesc,
        state_begin: ResourceState,
        state_end: ResourceState,
        swapchain: bool,
    ) -> ResourceHandle {
        let handle = ResourceHandle::new_external(self.next_id, swapchain);
        self.next_id += 1;
        self.decls.insert(
            handle,
            ResourceDecl::External {
                texture,
                desc,
                state_begin,
                state_end,
            },
        );
        handle
    }

    /// Append a pass. Passes execute in registration order.
    pub fn add_pass<Q: ExecutionDomain>(&mut self, pass: Pass<'cb, Q, D>) {
        trace!("registering pass `{}` on {:?}", pass.name, Q::QUEUE_TYPE);
        self.nodes.push(PassNode {
            name: pass.name,
            queue: Q::QUEUE_TYPE,
            accesses: pass.accesses,
            list_count: pass.list_count,
            execute: pass.execute,
        });
    }

    /// Number of registered passes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

impl<'cb, D: Device> Default for RenderTaskGraph<'cb, D> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Transition<D: Device> {
    pub(crate) texture: Arc<D::Texture>,
    pub(crate) before: ResourceState,
    pub(crate) after: ResourceState,
}

pub(crate) struct CompiledNode<'cb, D: Device> {
    pub(crate) name: String,
    pub(crate) queue: QueueType,
    pub(crate) list_count: usize,
    pub(crate) execute: BoxedPassFn<'cb, D>,
    pub(crate) transitions: Vec<Transition<D>>,
    pub(crate) waits: Vec<(SharedFence<D>, u64)>,
    pub(crate) signals: Vec<(SharedFence<D>, u64)>,
}

/// A compiled graph: per-pass transition plans plus the cross-queue fence edges,
/// ready to record and submit through
/// [`GraphManager::execute`](crate::graph::manager::GraphManager::execute).
pub struct CompiledGraph<'cb, D: Device> {
    pub(crate) nodes: Vec<CompiledNode<'cb, D>>,
    // trailing transitions returning externals to their required end state
    pub(crate) epilogue: Vec<(QueueType, Transition<D>)>,
    pub(crate) resolved: HashMap<ResourceHandle, InstanceKey>,
    // (producer, consumer) pass indices, one fence pair each
    pub(crate) cross_queue: Vec<(usize, usize)>,
}

impl<'cb, D: Device> CompiledGraph<'cb, D> {
    /// Number of compiled passes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of cross-queue fence pairs this compile inserted.
    pub fn num_cross_queue_edges(&self) -> usize {
        self.cross_queue.len()
    }
}

pub(crate) fn compile<'cb, D: Device>(
    graph: RenderTaskGraph<'cb, D>,
    pool: &mut ResourcePool<D>,
    rentals: &RentalPools<D>,
) -> Result<CompiledGraph<'cb, D>> {
    // Real stages must never collide with the FRONT/BACK sentinels.
    assert!(
        graph.nodes.len() < i32::MAX as usize,
        "graph exceeds the representable stage range"
    );

    for (handle, decl) in graph.decls.iter() {
        if let ResourceDecl::External {
            texture,
            desc,
            state_begin,
            state_end,
        } = decl
        {
            pool.register_external(*handle, texture.clone(), *desc, *state_begin, *state_end)?;
        }
    }

    let mut resolved: HashMap<ResourceHandle, InstanceKey> = HashMap::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();
    let mut compiled: Vec<CompiledNode<'cb, D>> = Vec::with_capacity(graph.nodes.len());

    for (index, node) in graph.nodes.into_iter().enumerate() {
        let stage = TaskStage::new(index);
        let mut transitions = Vec::new();

        for PassAccess { handle, access } in node.accesses.iter().copied() {
            let key = match graph.decls.get(&handle) {
                Some(ResourceDecl::Transient(desc)) => pool.acquire(desc, access)?,
                Some(ResourceDecl::External { .. }) => pool
                    .external_key(handle)
                    .ok_or(Error::ExternalNotRegistered(handle))?,
                None => return Err(Error::InvalidHandle(handle).into()),
            };
            resolved.insert(handle, key);

            let instance = pool.get_mut(key);
            let required = access.required_state();
            if instance.curr_state != required {
                trace!(
                    "pass `{}`: {:?} transitions {:?} -> {:?}",
                    node.name,
                    handle,
                    instance.curr_state,
                    required
                );
                transitions.push(Transition {
                    texture: instance.texture().clone(),
                    before: instance.curr_state,
                    after: required,
                });
                instance.prev_state = instance.curr_state;
                instance.curr_state = required;
            }

            // A hazard spanning queue types needs a fence pair on top of the barrier;
            // same-queue hazards are fully ordered by the queue itself.
            if let Some((last_queue, last_access)) = instance.last_queue_access {
                if last_queue != node.queue && (last_access.is_write() || access.is_write()) {
                    if let Some(producer) = instance.last_stage.index() {
                        if producer != index && seen_edges.insert((producer, index)) {
                            edges.push((producer, index));
                        }
                    }
                }
            }
            instance.last_stage = stage;
            instance.last_queue_access = Some((node.queue, access));
        }

        compiled.push(CompiledNode {
            name: node.name,
            queue: node.queue,
            list_count: node.list_count,
            execute: node.execute,
            transitions,
            waits: Vec::new(),
            signals: Vec::new(),
        });
    }

    // One rented fence and one fresh value per edge: the signal goes right after the
    // producer's lists, the wait right before the consumer's.
    for &(producer, consumer) in &edges {
        let mut fence = rentals.rent_fence()?;
        let value = fence.advance();
        let fence: SharedFence<D> = Arc::new(fence);
        debug!(
            "cross-queue edge `{}` -> `{}` at fence value {}",
            compiled[producer].name, compiled[consumer].name, value
        );
        compiled[producer].signals.push((fence.clone(), value));
        compiled[consumer].waits.push((fence, value));
    }

    // Externals whose cached state differs from their required end state get a
    // trailing transition anchored at the BACK sentinel, so e.g. a swap chain buffer
    // is always left presentable.
    let mut epilogue = Vec::new();
    for key in pool.external_keys() {
        let instance = pool.get_mut(key);
        let Some((_, state_end, swapchain)) = instance.external_states() else {
            continue;
        };
        if instance.curr_state == state_end {
            continue;
        }
        let queue = if swapchain {
            QueueType::Graphics
        } else {
            instance
                .last_queue_access
                .map(|(queue, _)| queue)
                .unwrap_or(QueueType::Graphics)
        };
        epilogue.push((
            queue,
            Transition {
                texture: instance.texture().clone(),
                before: instance.curr_state,
                after: state_end,
            },
        ));
        instance.prev_state = instance.curr_state;
        instance.curr_state = state_end;
        instance.last_stage = TaskStage::BACK;
    }

    Ok(CompiledGraph {
        nodes: compiled,
        epilogue,
        resolved,
        cross_queue: edges,
    })
}

pub(crate) fn execute<'cb, D: Device>(
    compiled: CompiledGraph<'cb, D>,
    device: &D,
    pool: &ResourcePool<D>,
    rentals: &RentalPools<D>,
) -> Result<SubmitSet<D>> {
    let mut set = SubmitSet::new();
    let resolved = compiled.resolved;

    for mut node in compiled.nodes {
        // Lists rent lazily, here on first access; their identity is frame-scoped.
        let mut lists = Vec::with_capacity(node.list_count);
        for _ in 0..node.list_count {
            let mut list = rentals.rent_list(node.queue)?;
            device.begin_command_list(&mut list.list)?;
            lists.push(list);
        }

        // Transitions are recorded immediately before the pass's own commands.
        for transition in &node.transitions {
            device.cmd_resource_barrier(
                &mut lists[0].list,
                &transition.texture,
                transition.before,
                transition.after,
            );
        }

        let exec_result = {
            let mut pass = PassContext {
                device,
                lists: lists.as_mut_slice(),
                resources: PassResources {
                    pool,
                    resolved: &resolved,
                },
            };
            node.execute.execute(&mut pass)
        };
        // Close the lists even on failure; an open list must never reach the pool.
        for list in lists.iter_mut() {
            device.end_command_list(&mut list.list)?;
        }
        exec_result?;

        let sequence = set.queue_mut(node.queue);
        for (fence, value) in node.waits {
            sequence.push(SubmitItem::Wait { fence, value });
        }
        for list in lists {
            sequence.push(SubmitItem::CommandList(list));
        }
        for (fence, value) in node.signals {
            sequence.push(SubmitItem::Signal { fence, value });
        }
    }

    for queue in [QueueType::Graphics, QueueType::Compute] {
        let transitions: Vec<&Transition<D>> = compiled
            .epilogue
            .iter()
            .filter(|(q, _)| *q == queue)
            .map(|(_, t)| t)
            .collect();
        if transitions.is_empty() {
            continue;
        }
        let mut list = rentals.rent_list(queue)?;
        device.begin_command_list(&mut list.list)?;
        for transition in transitions {
            device.cmd_resource_barrier(
                &mut list.list,
                &transition.texture,
                transition.before,
                transition.after,
            );
        }
        device.end_command_list(&mut list.list)?;
        set.queue_mut(queue).push(SubmitItem::CommandList(list));
    }

    Ok(set)
}
