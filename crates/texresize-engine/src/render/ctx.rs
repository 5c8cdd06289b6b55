use crate::coords::Viewport;

/// Renderer-facing context (device/queue + active viewport).
///
/// `viewport` is the presentation target for the current frame. Resizing
/// components read it as the resolution they must not shrink below.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub viewport: Viewport, // physical px
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, viewport: Viewport) -> Self {
        Self {
            device,
            queue,
            viewport,
        }
    }
}
