//! Descriptors for pooled 2D resources, usable directly as pool lookup keys.

use static_assertions::assert_eq_size;

/// Pixel formats the pool can describe. The discriminant participates in the
/// descriptor's binary image, so variants are explicitly numbered.
#[repr(u32)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PixelFormat {
    Rgba8Unorm = 0,
    Bgra8Unorm = 1,
    Rgba16Float = 2,
    Rg16Float = 3,
    R32Float = 4,
    Rgba32Float = 5,
    R8Unorm = 6,
    Depth32Float = 7,
    Depth24Stencil8 = 8,
}

impl PixelFormat {
    /// True for depth/stencil formats, which have no unordered-access view.
    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth32Float | PixelFormat::Depth24Stencil8)
    }
}

/// Describes a 2D resource request with absolute dimensions.
///
/// The struct is plain data with no padding and no derived fields, so its binary image
/// doubles as the pool lookup key: two descriptors request the same pooled resource if
/// and only if they are bit-equal.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ResourceDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub samples: u32,
}

// The pool key contract: the descriptor must hash as a plain integer pair.
assert_eq_size!(ResourceDesc, [u64; 2]);

impl ResourceDesc {
    /// Describe a single-sampled 2D resource.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            samples: 1,
        }
    }

    /// Set the sample count for multisampled targets.
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// The descriptor's binary image as the integer pair it hashes as.
    pub fn key(&self) -> (u64, u64) {
        (
            (self.width as u64) << 32 | self.height as u64,
            (self.format as u64) << 32 | self.samples as u64,
        )
    }
}
