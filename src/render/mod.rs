//! Frame synthesis: background warp, particle projection, compositing, fade.

/// Rendered frame buffers.
pub mod frame;
pub(crate) mod synth;
