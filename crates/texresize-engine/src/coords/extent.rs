/// Width and height of a texture or render target, in texels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Strictly taller than wide. Square extents count as landscape.
    #[inline]
    pub fn is_portrait(self) -> bool {
        self.width < self.height
    }

    /// Swaps width and height.
    #[inline]
    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Integer halving of both sides (truncating).
    #[inline]
    pub fn halved(self) -> Self {
        Self::new(self.width / 2, self.height / 2)
    }

    /// Integer division of both sides by `divisor` (truncating).
    ///
    /// `divisor` must be non-zero.
    #[inline]
    pub fn div(self, divisor: u32) -> Self {
        debug_assert!(divisor > 0);
        Self::new(self.width / divisor, self.height / divisor)
    }

    /// True when both sides are at least as large as `other`'s.
    #[inline]
    pub fn covers(self, other: Extent) -> bool {
        self.width >= other.width && self.height >= other.height
    }

    pub(crate) fn to_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
