//! CPU raster primitives shared by preprocessing and frame synthesis.

pub(crate) mod composite;
pub(crate) mod paint;
pub(crate) mod resize;
