//! Particle seeds: detection on the canvas, activation, and sprite tiles.

pub(crate) mod extract;
pub(crate) mod seed;
pub(crate) mod sprite;
