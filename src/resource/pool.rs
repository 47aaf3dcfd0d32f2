//! Pooled lifetime management for transient 2D resources.
//!
//! The pool is the single owner of every transient texture the task graph touches.
//! Acquiring with a descriptor either returns the instance already registered under
//! that exact bit pattern, or allocates a new one through the device. Instances that go
//! unused for a configurable number of consecutive frames release their underlying
//! storage again.
//!
//! Externally owned resources (most importantly the swap chain back buffer) are
//! registered per compile and tracked identically for state-transition purposes, but
//! their lifetime stays with the caller and the unused-frame counter never evicts them.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use slotmap::SlotMap;

use crate::core::device::{Device, ViewKind};
use crate::graph::stage::TaskStage;
use crate::resource::descriptor::ResourceDesc;
use crate::resource::handle::ResourceHandle;
use crate::resource::state::{ResourceAccess, ResourceState};
use crate::sync::domain::QueueType;

slotmap::new_key_type! {
    /// Generation-checked key of a pooled resource instance. A key outliving its
    /// instance fails lookup instead of silently reading reused storage.
    pub struct InstanceKey;
}

#[derive(Copy, Clone, Debug)]
struct ExternalInfo {
    state_begin: ResourceState,
    state_end: ResourceState,
    swapchain: bool,
}

/// A pooled allocation: the texture, its views, and the cached transition state the
/// compiler reads and updates while resolving accesses.
pub struct PooledResource<D: Device> {
    texture: Arc<D::Texture>,
    read_view: D::View,
    write_view: Option<D::View>,
    target_view: D::View,
    desc: ResourceDesc,
    pub(crate) curr_state: ResourceState,
    pub(crate) prev_state: ResourceState,
    /// The last stage that touched this resource; seeded at the front sentinel so the
    /// first access of a compile always sees a well-defined prior position.
    pub(crate) last_stage: TaskStage,
    pub(crate) last_queue_access: Option<(QueueType, ResourceAccess)>,
    unused_frames: u32,
    touched: bool,
    external: Option<ExternalInfo>,
}

impl<D: Device> PooledResource<D> {
    /// The underlying texture.
    pub fn texture(&self) -> &Arc<D::Texture> {
        &self.texture
    }

    /// The requested view of the texture. Depth formats carry no write view.
    pub fn view(&self, kind: ViewKind) -> &D::View {
        match kind {
            ViewKind::Read => &self.read_view,
            ViewKind::Target => &self.target_view,
            ViewKind::Write => self
                .write_view
                .as_ref()
                .unwrap_or_else(|| panic!("no unordered-access view for {:?}", self.desc)),
        }
    }

    /// The descriptor this instance was allocated for.
    pub fn descriptor(&self) -> &ResourceDesc {
        &self.desc
    }

    /// The state the resource is currently cached in.
    pub fn current_state(&self) -> ResourceState {
        self.curr_state
    }

    /// The state the resource was in before its most recent transition.
    pub fn previous_state(&self) -> ResourceState {
        self.prev_state
    }

    pub(crate) fn external_states(&self) -> Option<(ResourceState, ResourceState, bool)> {
        self.external
            .map(|e| (e.state_begin, e.state_end, e.swapchain))
    }
}

/// Pool of transient 2D resources, keyed by descriptor bit-equality.
pub struct ResourcePool<D: Device> {
    device: D,
    instances: SlotMap<InstanceKey, PooledResource<D>>,
    by_desc: HashMap<ResourceDesc, InstanceKey>,
    // per-compile external registrations, by handle id
    externals: HashMap<u64, InstanceKey>,
    evict_after: u32,
}

impl<D: Device> ResourcePool<D> {
    /// Create an empty pool. `evict_after` is the number of consecutive unused frames
    /// after which an instance's storage is released.
    pub fn new(device: D, evict_after: u32) -> Self {
        Self {
            device,
            instances: SlotMap::with_key(),
            by_desc: HashMap::new(),
            externals: HashMap::new(),
            evict_after,
        }
    }

    fn create_views(
        device: &D,
        texture: &D::Texture,
        desc: &ResourceDesc,
    ) -> Result<(D::View, Option<D::View>, D::View)> {
        let read_view = device.create_view(texture, ViewKind::Read)?;
        let write_view = if desc.format.is_depth() {
            None
        } else {
            Some(device.create_view(texture, ViewKind::Write)?)
        };
        let target_view = device.create_view(texture, ViewKind::Target)?;
        Ok((read_view, write_view, target_view))
    }

    /// Acquire the pooled instance for `desc`, allocating it on a pool miss.
    ///
    /// A hit returns the instance registered under the exact bit pattern of `desc` and
    /// resets its unused-frame counter. Within one compile, repeated acquires with an
    /// identical descriptor always yield the same instance.
    pub fn acquire(&mut self, desc: &ResourceDesc, access: ResourceAccess) -> Result<InstanceKey> {
        match access {
            ResourceAccess::DepthTarget => {
                assert!(desc.format.is_depth(), "depth-target access on color format {:?}", desc)
            }
            ResourceAccess::RenderTarget | ResourceAccess::UnorderedAccess => {
                assert!(!desc.format.is_depth(), "{:?} access on depth format {:?}", access, desc)
            }
            ResourceAccess::ShaderRead => {}
        }

        if let Some(&key) = self.by_desc.get(desc) {
            let instance = self
                .instances
                .get_mut(key)
                .expect("pool lookup map points at a freed instance");
            // A key collision with mismatched actual geometry is a programmer error.
            assert_eq!(&instance.desc, desc, "pool hit with mismatched descriptor storage");
            instance.unused_frames = 0;
            instance.touched = true;
            return Ok(key);
        }

        trace!("pool miss for {:?}, allocating", desc);
        let texture = Arc::new(self.device.create_texture(desc)?);
        let (read_view, write_view, target_view) = Self::create_views(&self.device, &texture, desc)?;
        let key = self.instances.insert(PooledResource {
            texture,
            read_view,
            write_view,
            target_view,
            desc: *desc,
            curr_state: ResourceState::Common,
            prev_state: ResourceState::Common,
            last_stage: TaskStage::FRONT,
            last_queue_access: None,
            unused_frames: 0,
            touched: true,
            external: None,
        });
        self.by_desc.insert(*desc, key);
        Ok(key)
    }

    /// Register a caller-owned resource for the current compile. It participates in
    /// state resolution like a pooled instance, starting at `state_begin` and
    /// guaranteed to be left in `state_end` at the end of the compile, but it is never
    /// evicted by the unused-frame counter; its lifetime belongs to the caller.
    pub fn register_external(
        &mut self,
        handle: ResourceHandle,
        texture: Arc<D::Texture>,
        desc: ResourceDesc,
        state_begin: ResourceState,
        state_end: ResourceState,
    ) -> Result<InstanceKey> {
        assert!(handle.is_external(), "registering non-external handle {:?}", handle);
        let (read_view, write_view, target_view) = Self::create_views(&self.device, &texture, &desc)?;
        let key = self.instances.insert(PooledResource {
            texture,
            read_view,
            write_view,
            target_view,
            desc,
            curr_state: state_begin,
            prev_state: state_begin,
            last_stage: TaskStage::FRONT,
            last_queue_access: None,
            unused_frames: 0,
            touched: true,
            external: Some(ExternalInfo {
                state_begin,
                state_end,
                swapchain: handle.is_swapchain(),
            }),
        });
        self.externals.insert(handle.id(), key);
        Ok(key)
    }

    /// Advance the pool by one frame: drop the previous compile's external
    /// registrations, age every instance the previous compile did not touch, and evict
    /// instances whose unused-frame counter exceeds the threshold.
    pub fn begin_frame(&mut self) {
        for (_, key) in self.externals.drain() {
            self.instances.remove(key);
        }

        let mut evicted = Vec::new();
        for (key, instance) in self.instances.iter_mut() {
            if instance.touched {
                instance.touched = false;
            } else {
                instance.unused_frames += 1;
                if instance.unused_frames > self.evict_after {
                    evicted.push(key);
                }
            }
            // Reseed the per-compile tracking; cached state carries across frames.
            instance.last_stage = TaskStage::FRONT;
            instance.last_queue_access = None;
            instance.prev_state = instance.curr_state;
        }
        for key in evicted {
            let instance = self.instances.remove(key).unwrap();
            self.by_desc.remove(&instance.desc);
            debug!(
                "evicting pooled resource {:?} after {} unused frames",
                instance.desc, instance.unused_frames
            );
        }
    }

    /// The instance key an external handle was registered under for this compile.
    pub fn external_key(&self, handle: ResourceHandle) -> Option<InstanceKey> {
        self.externals.get(&handle.id()).copied()
    }

    pub(crate) fn external_keys(&self) -> Vec<InstanceKey> {
        self.externals.values().copied().collect()
    }

    /// Look up an instance. Panics on a stale key; a compile never outlives the
    /// instances it resolved.
    pub fn get(&self, key: InstanceKey) -> &PooledResource<D> {
        self.instances.get(key).expect("stale pooled resource key")
    }

    pub(crate) fn get_mut(&mut self, key: InstanceKey) -> &mut PooledResource<D> {
        self.instances
            .get_mut(key)
            .expect("stale pooled resource key")
    }

    /// Number of pool-owned (non-external) instances currently alive.
    pub fn pooled_count(&self) -> usize {
        self.instances.iter().filter(|(_, i)| i.external.is_none()).count()
    }

    /// True if an instance is registered under `desc`.
    pub fn contains(&self, desc: &ResourceDesc) -> bool {
        self.by_desc.contains_key(desc)
    }
}
