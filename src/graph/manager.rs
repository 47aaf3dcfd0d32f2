//! Owner of the pooled GPU objects and the per-frame graph lifecycle.

use anyhow::Result;

use crate::core::device::Device;
use crate::core::settings::CoreSettings;
use crate::graph::compiler::{self, CompiledGraph, RenderTaskGraph};
use crate::resource::pool::ResourcePool;
use crate::sync::domain::QueueType;
use crate::sync::rental::{Pooled, RentalPools, RentedList};
use crate::sync::submit::SubmitSet;

/// Drives the per-frame graph lifecycle and is the single owner of pooled GPU
/// objects: the transient texture pool and the fence/command-list rental pools. No
/// other component allocates pooled resources directly.
pub struct GraphManager<D: Device> {
    device: D,
    pool: ResourcePool<D>,
    rentals: RentalPools<D>,
    frame_index: u64,
}

impl<D: Device> GraphManager<D> {
    /// Create the manager and its pools.
    pub fn new(device: D, settings: &CoreSettings) -> Result<Self> {
        let rentals = RentalPools::new(&device)?;
        let pool = ResourcePool::new(device.clone(), settings.pool_evict_after);
        Ok(Self {
            device,
            pool,
            rentals,
            frame_index: 0,
        })
    }

    /// Reclaim unused pooled resources and advance the internal frame index.
    pub fn begin_frame(&mut self) {
        self.frame_index = self.frame_index.wrapping_add(1);
        self.pool.begin_frame();
    }

    /// The internal frame index, advanced once per [`begin_frame`](GraphManager::begin_frame).
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Rent an already-begun graphics command list for system-level frame-start work.
    pub fn new_frame_command_list(&self) -> Result<Pooled<RentedList<D>>> {
        let mut list = self.rentals.rent_list(QueueType::Graphics)?;
        self.device.begin_command_list(&mut list.list)?;
        Ok(list)
    }

    /// Compile a graph: resolve every declared access against the pool, plan state
    /// transitions and insert cross-queue fence pairs.
    pub fn compile<'cb>(&mut self, graph: RenderTaskGraph<'cb, D>) -> Result<CompiledGraph<'cb, D>> {
        compiler::compile(graph, &mut self.pool, &self.rentals)
    }

    /// Record a compiled graph through its pass callbacks and assemble the ordered
    /// submissions for both queues.
    pub fn execute(&mut self, compiled: CompiledGraph<'_, D>) -> Result<SubmitSet<D>> {
        compiler::execute(compiled, &self.device, &self.pool, &self.rentals)
    }

    /// The transient resource pool.
    pub fn pool(&self) -> &ResourcePool<D> {
        &self.pool
    }

    /// The device this manager drives.
    pub fn device(&self) -> &D {
        &self.device
    }
}
