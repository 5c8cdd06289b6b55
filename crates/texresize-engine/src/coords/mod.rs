//! Pixel-space size and viewport types.
//!
//! All values are physical pixels. Texture extents are unsigned; viewport origins
//! may be negative, matching what graphics APIs accept.

mod extent;
mod viewport;

pub use extent::Extent;
pub use viewport::Viewport;
