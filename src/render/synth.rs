use kurbo::{Affine, Vec2};

use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{NebulaError, NebulaResult};
use crate::params::RenderParameters;
use crate::particles::seed::ParticleSeed;
use crate::particles::sprite::SpriteSet;
use crate::preprocess::NormalizedCanvas;
use crate::raster::composite::{Region, scale_intensity};
use crate::raster::paint::FramePainter;
use crate::render::frame::Frame;

/// Particles are drawn only while their evolved depth stays inside this open interval.
const VISIBLE_DEPTH: (f64, f64) = (0.05, 2.0);
/// Drift direction units are scaled to this many pixels per second per unit of `speed`.
const DRIFT_PX_PER_SEC: f64 = 15.0;

/// Read-only view of everything one frame depends on.
///
/// Rendering borrows, never mutates, so any number of synthesizers may run over the same
/// snapshot concurrently.
#[derive(Clone, Copy)]
pub(crate) struct FrameSynthesizer<'a> {
    pub(crate) canvas: &'a NormalizedCanvas,
    pub(crate) sprites: &'a SpriteSet,
    pub(crate) particles: &'a [ParticleSeed],
    pub(crate) params: &'a RenderParameters,
}

/// Projected on-canvas particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Projected {
    pub(crate) x: i64,
    pub(crate) y: i64,
    pub(crate) size: u32,
}

impl FrameSynthesizer<'_> {
    /// Render frame `frame`, applying the fade envelope when `fade` is set.
    pub(crate) fn render(&self, frame: FrameIndex, fade: bool) -> NebulaResult<Frame> {
        let total = self.params.total_frames();
        if frame.0 >= total {
            return Err(NebulaError::InvalidFrameIndex {
                index: frame.0,
                total,
            });
        }

        let canvas = self.canvas.canvas();
        let t = self.params.frame_time_secs(frame.0);

        let mut painter = FramePainter::new(canvas)?;
        let backdrop = self.background_transform(t);
        // A collapsed zoom leaves the frame black.
        if backdrop.determinant().abs() > 1e-12 {
            painter.draw(self.canvas.layer(), backdrop);
        }
        self.composite_particles(t, canvas, &mut painter)?;
        let mut data = painter.finish();

        if fade {
            let alpha = fade_alpha(frame.0, total, self.params.fade_frames());
            scale_intensity(&mut data, alpha);
        }

        Ok(Frame {
            index: frame,
            time_secs: t,
            width: canvas.width,
            height: canvas.height,
            data,
        })
    }

    /// Similarity transform (rotation + uniform zoom) about the canvas center at time `t`.
    pub(crate) fn background_transform(&self, t: f64) -> Affine {
        let p = self.params;
        let angle = (p.rotate_degrees * t / p.duration_secs).to_radians();
        let scale = 1.0 + p.z_init * 0.1 + p.speed * t * 0.002 * f64::from(p.z_dir);
        let drift =
            Vec2::new(p.camera_drift[0], p.camera_drift[1]) * (p.speed * t * DRIFT_PX_PER_SEC);
        let center = self.canvas.canvas().center().to_vec2();

        Affine::translate(center + drift)
            * Affine::rotate(angle)
            * Affine::scale(scale)
            * Affine::translate(-center)
    }

    /// Where `seed` lands at time `t`, or `None` when it is invisible or off-canvas.
    pub(crate) fn project(
        &self,
        seed: &ParticleSeed,
        t: f64,
        canvas: Canvas,
    ) -> Option<Projected> {
        let p = self.params;
        let z = seed.depth + t * (p.particle_speed * 0.01) * f64::from(p.particle_dir) * -1.0;
        if !(z > VISIBLE_DEPTH.0 && z < VISIBLE_DEPTH.1) {
            return None;
        }
        let scale_p = 1.0 / z;

        let angle = (p.particle_rotate_degrees * t / p.duration_secs).to_radians();
        let (sin, cos) = angle.sin_cos();
        let center = canvas.center();
        let off = Vec2::new(seed.x - center.x, seed.y - center.y);
        let rotated = Vec2::new(off.x * cos - off.y * sin, off.x * sin + off.y * cos);

        // Truncation toward zero, matching integer pixel addressing of the projected point.
        let x = (center.x + rotated.x * scale_p) as i64;
        let y = (center.y + rotated.y * scale_p) as i64;
        if x < 0 || y < 0 || x >= i64::from(canvas.width) || y >= i64::from(canvas.height) {
            return None;
        }
        Some(Projected {
            x,
            y,
            size: seed.base_size,
        })
    }

    fn composite_particles(
        &self,
        t: f64,
        canvas: Canvas,
        painter: &mut FramePainter,
    ) -> NebulaResult<()> {
        for seed in self.particles {
            let Some(pt) = self.project(seed, t, canvas) else {
                continue;
            };
            let region = Region::centered(pt.x, pt.y, pt.size, canvas.width, canvas.height);
            if region.is_empty() {
                continue;
            }
            let tile = self.sprites.tile(region.width(), region.height())?;
            let at = Vec2::new(f64::from(region.x0), f64::from(region.y0));
            painter.draw(&tile, Affine::translate(at));
        }
        Ok(())
    }
}

/// Linear fade-in/fade-out multiplier for `frame` of a `total`-frame clip.
///
/// With `fade_frames == 0` the envelope is flat at 1.
pub(crate) fn fade_alpha(frame: u64, total: u64, fade_frames: u64) -> f64 {
    if frame < fade_frames {
        frame as f64 / fade_frames as f64
    } else if frame + fade_frames > total {
        (total - frame) as f64 / fade_frames as f64
    } else {
        1.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/synth.rs"]
mod tests;
