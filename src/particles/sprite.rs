use std::collections::BTreeMap;

use crate::assets::decode::ParticleSprite;
use crate::foundation::error::NebulaResult;
use crate::particles::seed::ParticleSeed;
use crate::raster::paint::ImageLayer;
use crate::raster::resize::resize_rgba_area;

/// Sprite tiles pre-resized for the square sizes the active particles use.
///
/// Only distinct base sizes are cached, so the set holds at most one tile per particle.
/// Clipped (non-square) regions at the canvas border and uncached sizes are resized on demand.
#[derive(Clone, Debug)]
pub(crate) struct SpriteSet {
    source: image::RgbaImage,
    squares: BTreeMap<u32, ImageLayer>,
}

impl SpriteSet {
    /// Cache a square tile for every distinct non-zero size in `sizes`.
    pub(crate) fn new(
        sprite: &ParticleSprite,
        sizes: impl IntoIterator<Item = u32>,
    ) -> NebulaResult<Self> {
        let mut squares = BTreeMap::new();
        for size in sizes {
            if size == 0 || squares.contains_key(&size) {
                continue;
            }
            let tile = resize_rgba_area(&sprite.rgba, size, size)?;
            squares.insert(size, ImageLayer::from_rgba(&tile)?);
        }
        Ok(Self {
            source: sprite.rgba.clone(),
            squares,
        })
    }

    /// Cache the tiles `particles` draw when unclipped.
    pub(crate) fn for_particles(
        sprite: &ParticleSprite,
        particles: &[ParticleSeed],
    ) -> NebulaResult<Self> {
        Self::new(sprite, particles.iter().map(|p| p.base_size))
    }

    /// Number of cached square tiles.
    pub(crate) fn len(&self) -> usize {
        self.squares.len()
    }

    /// Tile of exactly `width × height`.
    pub(crate) fn tile(&self, width: u32, height: u32) -> NebulaResult<ImageLayer> {
        if width == height
            && let Some(t) = self.squares.get(&width)
        {
            return Ok(t.clone());
        }
        ImageLayer::from_rgba(&resize_rgba_area(&self.source, width, height)?)
    }
}
