use std::path::Path;
use std::sync::Arc;

use crate::assets::decode::{ParticleSprite, SourceImage};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::NebulaResult;
use crate::params::RenderParameters;
use crate::particles::extract::{ExtractOpts, extract};
use crate::particles::seed::SeedPool;
use crate::particles::sprite::SpriteSet;
use crate::preprocess::{NormalizedCanvas, PreprocessOpts, normalize};
use crate::render::frame::Frame;
use crate::session::snapshot::EngineSnapshot;

/// Edge length of the built-in glow sprite used when no sprite asset is given.
pub const DEFAULT_GLOW_SIZE: u32 = 64;

/// Construction-time options for [`Engine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineOpts {
    /// Canvas normalization.
    pub preprocess: PreprocessOpts,
    /// Bright-point detection and the RNG seed for particle ordering.
    pub extract: ExtractOpts,
}

/// Owns the normalized canvas and the particle seed pool for one source photo.
///
/// The canvas and the pool never change after construction. Parameters are applied by building a
/// new [`EngineSnapshot`]; the active particles and their sprite tiles are only rebuilt when the
/// particle size or count changes.
#[derive(Debug)]
pub struct Engine {
    sprite: ParticleSprite,
    canvas: Arc<NormalizedCanvas>,
    pool: SeedPool,
    current: Arc<EngineSnapshot>,
}

impl Engine {
    /// Preprocess `source`, extract its particle seeds and build the first snapshot.
    #[tracing::instrument(
        skip_all,
        fields(src_w = source.width(), src_h = source.height(), seed = opts.extract.seed)
    )]
    pub fn new(
        source: &SourceImage,
        sprite: ParticleSprite,
        params: RenderParameters,
        opts: EngineOpts,
    ) -> NebulaResult<Self> {
        params.validate()?;
        let canvas = Arc::new(normalize(source, opts.preprocess)?);
        let pool = extract(&canvas, opts.extract);

        let particles: Arc<[_]> = pool
            .activate(params.particle_count, params.particle_size)
            .into();
        let sprites = Arc::new(SpriteSet::for_particles(&sprite, &particles)?);
        let current = Arc::new(EngineSnapshot {
            canvas: Arc::clone(&canvas),
            sprites,
            particles,
            params,
        });

        tracing::info!(
            width = current.canvas().width,
            height = current.canvas().height,
            seeds = pool.len(),
            active = current.particles().len(),
            total_frames = current.total_frames(),
            "engine ready"
        );
        Ok(Self {
            sprite,
            canvas,
            pool,
            current,
        })
    }

    /// Load the photo (and optionally the sprite) from disk, then call [`Engine::new`].
    ///
    /// Without a sprite path the procedural glow sprite is used.
    pub fn from_paths(
        image: impl AsRef<Path>,
        sprite: Option<&Path>,
        params: RenderParameters,
        opts: EngineOpts,
    ) -> NebulaResult<Self> {
        let source = SourceImage::open(image)?;
        let sprite = match sprite {
            Some(p) => ParticleSprite::open(p)?,
            None => ParticleSprite::glow(DEFAULT_GLOW_SIZE),
        };
        Self::new(&source, sprite, params, opts)
    }

    /// The normalized canvas.
    pub fn canvas(&self) -> &NormalizedCanvas {
        &self.canvas
    }

    /// Every detected seed, in shuffled order.
    pub fn seed_pool(&self) -> &SeedPool {
        &self.pool
    }

    /// Parameters of the current snapshot.
    pub fn params(&self) -> &RenderParameters {
        self.current.params()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.current)
    }

    /// Validate `params` and swap in a snapshot built from them.
    ///
    /// On error the current snapshot is kept.
    pub fn apply_parameters(
        &mut self,
        params: RenderParameters,
    ) -> NebulaResult<Arc<EngineSnapshot>> {
        params.validate()?;
        let prev = &self.current;

        let (sprites, particles) = if prev.params.particles_differ(&params) {
            let particles: Arc<[_]> = self
                .pool
                .activate(params.particle_count, params.particle_size)
                .into();
            let sprites = SpriteSet::for_particles(&self.sprite, &particles)?;
            tracing::debug!(
                count = params.particle_count,
                size = params.particle_size,
                tiles = sprites.len(),
                "reactivating particles"
            );
            (Arc::new(sprites), particles)
        } else {
            (Arc::clone(&prev.sprites), Arc::clone(&prev.particles))
        };

        self.current = Arc::new(EngineSnapshot {
            canvas: Arc::clone(&self.canvas),
            sprites,
            particles,
            params,
        });
        Ok(self.snapshot())
    }

    /// Render a frame from the current snapshot.
    pub fn render_frame(&self, frame: FrameIndex, fade: bool) -> NebulaResult<Frame> {
        self.current.render_frame(frame, fade)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/engine.rs"]
mod tests;
