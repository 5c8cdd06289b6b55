use super::Extent;

/// Viewport rectangle in physical pixels.
///
/// Only `width`/`height` drive resizing decisions; the origin is carried so a
/// viewport can be handed back to a render pass unchanged.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport anchored at the origin covering `extent`.
    #[inline]
    pub const fn from_extent(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    #[inline]
    pub fn extent(self) -> Extent {
        Extent::new(self.width, self.height)
    }
}
