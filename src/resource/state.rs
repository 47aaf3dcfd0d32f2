//! GPU-visible resource states and the access kinds tasks declare.

use crate::core::device::ViewKind;

/// The GPU-visible access mode a resource is currently in. Moving between states
/// requires an explicit transition barrier, which the compiler emits automatically.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ResourceState {
    /// The state fresh pool allocations start in.
    #[default]
    Common,
    RenderTarget,
    DepthWrite,
    ShaderResource,
    UnorderedAccess,
    /// Presentable state for swap chain back buffers.
    Present,
}

/// The access kind a task declares on a resource.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ResourceAccess {
    RenderTarget,
    DepthTarget,
    ShaderRead,
    UnorderedAccess,
}

impl ResourceAccess {
    /// Render-target, depth-target and unordered-access are writes whose completion
    /// must be observed by later accesses; shader-read is the sole read access. This
    /// classification decides whether a transition barrier alone suffices or a
    /// queue-crossing signal/wait is also required.
    pub fn is_write(self) -> bool {
        !matches!(self, ResourceAccess::ShaderRead)
    }

    /// The state a resource must be transitioned to for this access.
    pub fn required_state(self) -> ResourceState {
        match self {
            ResourceAccess::RenderTarget => ResourceState::RenderTarget,
            ResourceAccess::DepthTarget => ResourceState::DepthWrite,
            ResourceAccess::ShaderRead => ResourceState::ShaderResource,
            ResourceAccess::UnorderedAccess => ResourceState::UnorderedAccess,
        }
    }

    /// The view a pass binds for this access.
    pub fn view_kind(self) -> ViewKind {
        match self {
            ResourceAccess::RenderTarget | ResourceAccess::DepthTarget => ViewKind::Target,
            ResourceAccess::ShaderRead => ViewKind::Read,
            ResourceAccess::UnorderedAccess => ViewKind::Write,
        }
    }
}
