//! Renderer-facing context types.
//!
//! Components that issue GPU work receive a [`RenderCtx`] rather than owning the
//! device; the context also carries the viewport the frame will be presented in.

mod ctx;

pub use ctx::RenderCtx;
