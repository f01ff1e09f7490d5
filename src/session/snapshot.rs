use std::sync::Arc;

use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::NebulaResult;
use crate::params::RenderParameters;
use crate::particles::seed::ParticleSeed;
use crate::particles::sprite::SpriteSet;
use crate::preprocess::NormalizedCanvas;
use crate::render::frame::Frame;
use crate::render::synth::FrameSynthesizer;

/// Everything needed to render any frame of one clip, frozen at creation.
///
/// Snapshots are shared through `Arc`; an encode holding one is unaffected by later
/// [`Engine::apply_parameters`](crate::Engine::apply_parameters) calls.
#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    pub(crate) canvas: Arc<NormalizedCanvas>,
    pub(crate) sprites: Arc<SpriteSet>,
    pub(crate) particles: Arc<[ParticleSeed]>,
    pub(crate) params: RenderParameters,
}

impl EngineSnapshot {
    /// Parameters this snapshot renders with.
    pub fn params(&self) -> &RenderParameters {
        &self.params
    }

    /// Output frame size.
    pub fn canvas(&self) -> Canvas {
        self.canvas.canvas()
    }

    /// The normalized background image.
    pub fn normalized(&self) -> &NormalizedCanvas {
        &self.canvas
    }

    /// Active particles, in compositing order.
    pub fn particles(&self) -> &[ParticleSeed] {
        &self.particles
    }

    /// Number of frames in the clip.
    pub fn total_frames(&self) -> u64 {
        self.params.total_frames()
    }

    /// Render one frame. `fade` applies the fade-in/fade-out envelope.
    pub fn render_frame(&self, frame: FrameIndex, fade: bool) -> NebulaResult<Frame> {
        self.synthesizer().render(frame, fade)
    }

    pub(crate) fn synthesizer(&self) -> FrameSynthesizer<'_> {
        FrameSynthesizer {
            canvas: &self.canvas,
            sprites: &self.sprites,
            particles: &self.particles,
            params: &self.params,
        }
    }
}
