//! Image inputs: the source photo and the particle sprite.

pub(crate) mod decode;
