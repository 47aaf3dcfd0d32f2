//! Opaque handles identifying the resources declared for one graph compile.

use std::fmt;

const EXTERNAL_BIT: u64 = 1 << 63;
const SWAPCHAIN_BIT: u64 = 1 << 62;
const ID_MASK: u64 = SWAPCHAIN_BIT - 1;

/// Opaque 64-bit key naming a resource within a graph compile.
///
/// The key encodes a unique id in the low bits and two flags: whether the resource is
/// externally owned, and whether it is the swap chain back buffer. Id zero is reserved
/// invalid regardless of the flag bits. Handles are plain values, not owners; they
/// index into the pool's maps.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// The invalid handle.
    pub const INVALID: ResourceHandle = ResourceHandle(0);

    pub(crate) fn new_internal(id: u64) -> Self {
        debug_assert!(id != 0 && id <= ID_MASK);
        ResourceHandle(id)
    }

    pub(crate) fn new_external(id: u64, swapchain: bool) -> Self {
        debug_assert!(id != 0 && id <= ID_MASK);
        let flags = EXTERNAL_BIT | if swapchain { SWAPCHAIN_BIT } else { 0 };
        ResourceHandle(id | flags)
    }

    /// The unique id, without the flag bits.
    pub fn id(self) -> u64 {
        self.0 & ID_MASK
    }

    /// True unless the id is the reserved zero id.
    pub fn is_valid(self) -> bool {
        self.id() != 0
    }

    /// True if the resource is owned outside the pool.
    pub fn is_external(self) -> bool {
        self.0 & EXTERNAL_BIT != 0
    }

    /// True if the resource is the swap chain back buffer.
    pub fn is_swapchain(self) -> bool {
        self.0 & SWAPCHAIN_BIT != 0
    }

    /// The raw 64-bit key.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("ResourceHandle(invalid)");
        }
        write!(f, "ResourceHandle({}", self.id())?;
        if self.is_external() {
            f.write_str(", external")?;
        }
        if self.is_swapchain() {
            f.write_str(", swapchain")?;
        }
        f.write_str(")")
    }
}
