//! Exposes all structs needed to store initialization parameters.

/// Number of frames the CPU may run ahead of the GPU by default. With two frames in
/// flight, one frame is prepared on the CPU while the previous one renders on the GPU,
/// which gives a good amount of pipelining while avoiding input lag.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Consecutive unused frames after which a pooled resource is evicted by default.
pub const DEFAULT_POOL_EVICT_AFTER: u32 = 8;

/// Default depth of the frame statistics ring.
pub const DEFAULT_STATS_DEPTH: usize = 32;

/// Initialization parameters for the frame loop core.
///
/// # Example
/// ```
/// use deimos::prelude::*;
///
/// let settings = SettingsBuilder::new()
///     .name("deimos demo app")
///     .frames_in_flight(3)
///     .pool_evict_after(4)
///     .build();
/// assert_eq!(settings.frames_in_flight, 3);
/// ```
#[derive(Debug, Clone)]
pub struct CoreSettings {
    /// Application name used in diagnostics.
    pub name: String,
    /// Upper bound on frames of GPU work outstanding before the CPU stalls. The actual
    /// in-flight slot count is at least the swap chain's back buffer count.
    pub frames_in_flight: usize,
    /// Number of consecutive frames a pooled resource may go unused before its
    /// underlying storage is released.
    pub pool_evict_after: u32,
    /// Depth of the per-frame timing statistics ring.
    pub stats_depth: usize,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            name: String::from("deimos app"),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            pool_evict_after: DEFAULT_POOL_EVICT_AFTER,
            stats_depth: DEFAULT_STATS_DEPTH,
        }
    }
}

/// Builder for [`CoreSettings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    inner: CoreSettings,
}

impl SettingsBuilder {
    /// Create a builder initialized with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Set the number of frames in flight. Must be at least one.
    pub fn frames_in_flight(mut self, count: usize) -> Self {
        self.inner.frames_in_flight = count;
        self
    }

    /// Set the pool eviction threshold, in consecutive unused frames.
    pub fn pool_evict_after(mut self, frames: u32) -> Self {
        self.inner.pool_evict_after = frames;
        self
    }

    /// Set the depth of the frame statistics ring.
    pub fn stats_depth(mut self, depth: usize) -> Self {
        self.inner.stats_depth = depth;
        self
    }

    /// Obtain the finished settings.
    pub fn build(self) -> CoreSettings {
        self.inner
    }
}
