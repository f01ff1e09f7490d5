//! Pixel-budget normalization of the source photo onto the working canvas.

use crate::assets::decode::SourceImage;
use crate::foundation::core::Canvas;
use crate::foundation::error::{NebulaError, NebulaResult};
use crate::raster::paint::ImageLayer;
use crate::raster::resize::resize_rgb_area;

/// Default cap on the source pixel count before height normalization.
pub const DEFAULT_PIXEL_BUDGET: u64 = 2_000_000;
/// Default working-canvas height.
pub const DEFAULT_TARGET_HEIGHT: u32 = 1080;

/// Normalization policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreprocessOpts {
    /// Sources above this pixel count are first shrunk to roughly this many pixels.
    pub pixel_budget: u64,
    /// Output height; must be at least 2.
    pub target_height: u32,
}

impl Default for PreprocessOpts {
    fn default() -> Self {
        Self {
            pixel_budget: DEFAULT_PIXEL_BUDGET,
            target_height: DEFAULT_TARGET_HEIGHT,
        }
    }
}

/// The photo at working resolution plus the scale that produced it.
#[derive(Clone, Debug)]
pub struct NormalizedCanvas {
    pub(crate) rgb: image::RgbImage,
    layer: ImageLayer,
    scale_factor: f64,
}

impl NormalizedCanvas {
    /// Canvas dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.rgb.width(),
            height: self.rgb.height(),
        }
    }

    /// Product of the pixel-budget scale and the height-normalization scale.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Borrow the canvas pixels.
    pub fn image(&self) -> &image::RgbImage {
        &self.rgb
    }

    /// The canvas uploaded for rasterization.
    pub(crate) fn layer(&self) -> &ImageLayer {
        &self.layer
    }
}

/// Output size and scale chosen for a `width × height` source.
pub(crate) fn plan_size(
    width: u32,
    height: u32,
    opts: PreprocessOpts,
) -> NebulaResult<(Canvas, f64)> {
    if width == 0 || height == 0 {
        return Err(NebulaError::image_load("source image has zero area"));
    }
    if opts.target_height < 2 {
        return Err(NebulaError::invalid_parameter("target height must be >= 2"));
    }
    if opts.pixel_budget == 0 {
        return Err(NebulaError::invalid_parameter("pixel budget must be > 0"));
    }

    let pixels = u64::from(width) * u64::from(height);
    let (scale_a, w_a, h_a) = if pixels > opts.pixel_budget {
        let s = (opts.pixel_budget as f64 / pixels as f64).sqrt();
        let w = ((f64::from(width) * s) as u32).max(1);
        let h = ((f64::from(height) * s) as u32).max(1);
        (s, w, h)
    } else {
        (1.0, width, height)
    };

    let scale_b = f64::from(opts.target_height) / f64::from(h_a);
    let out_w = (f64::from(w_a) * scale_b).round() as u32 / 2 * 2;
    Ok((
        Canvas {
            width: out_w.max(2),
            height: opts.target_height,
        },
        scale_a * scale_b,
    ))
}

/// Normalize `src` onto the working canvas.
///
/// Height becomes `opts.target_height`, width keeps the aspect ratio rounded down to an even
/// number, and the resample is area-averaged.
#[tracing::instrument(skip(src), fields(src_w = src.width(), src_h = src.height()))]
pub fn normalize(src: &SourceImage, opts: PreprocessOpts) -> NebulaResult<NormalizedCanvas> {
    let (canvas, scale_factor) = plan_size(src.width(), src.height(), opts)?;
    let rgb = resize_rgb_area(&src.rgb, canvas.width, canvas.height)?;
    tracing::debug!(
        width = canvas.width,
        height = canvas.height,
        scale_factor,
        "normalized source"
    );
    let layer = ImageLayer::from_rgb(&rgb)?;
    Ok(NormalizedCanvas {
        rgb,
        layer,
        scale_factor,
    })
}
