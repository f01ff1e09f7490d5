use std::path::Path;

use crate::foundation::error::{NebulaError, NebulaResult};

/// Decoded source photo, always 8-bit RGB.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pub(crate) rgb: image::RgbImage,
}

impl SourceImage {
    /// Wrap an already-decoded RGB buffer.
    pub fn from_rgb(rgb: image::RgbImage) -> NebulaResult<Self> {
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(NebulaError::image_load(format!(
                "source image has zero area ({}x{})",
                rgb.width(),
                rgb.height()
            )));
        }
        Ok(Self { rgb })
    }

    /// Decode any format supported by `image` from memory.
    pub fn from_bytes(bytes: &[u8]) -> NebulaResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| NebulaError::image_load(format!("decode source image: {e}")))?;
        Self::from_rgb(img.to_rgb8())
    }

    /// Decode a source photo from disk.
    pub fn open(path: impl AsRef<Path>) -> NebulaResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| {
            NebulaError::image_load(format!("open source image '{}': {e}", path.display()))
        })?;
        Self::from_rgb(img.to_rgb8())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Total pixel count.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

/// Particle sprite in straight-alpha RGBA8.
///
/// A sprite decoded from a format without transparency composites as an opaque square stamp.
#[derive(Clone, Debug)]
pub struct ParticleSprite {
    pub(crate) rgba: image::RgbaImage,
    has_alpha: bool,
}

impl ParticleSprite {
    /// Wrap a straight-alpha RGBA buffer.
    pub fn from_rgba(rgba: image::RgbaImage) -> NebulaResult<Self> {
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(NebulaError::image_load("particle sprite has zero area"));
        }
        Ok(Self {
            rgba,
            has_alpha: true,
        })
    }

    /// Decode a sprite from memory.
    pub fn from_bytes(bytes: &[u8]) -> NebulaResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| NebulaError::image_load(format!("decode particle sprite: {e}")))?;
        Self::from_dynamic(img, "<memory>")
    }

    /// Decode a sprite from disk.
    pub fn open(path: impl AsRef<Path>) -> NebulaResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| {
            NebulaError::image_load(format!("open particle sprite '{}': {e}", path.display()))
        })?;
        Self::from_dynamic(img, &path.display().to_string())
    }

    fn from_dynamic(img: image::DynamicImage, origin: &str) -> NebulaResult<Self> {
        let has_alpha = img.color().has_alpha();
        if !has_alpha {
            tracing::warn!(
                sprite = origin,
                "particle sprite has no alpha channel; particles will be stamped opaque"
            );
        }
        let mut sprite = Self::from_rgba(img.to_rgba8())?;
        sprite.has_alpha = has_alpha;
        Ok(sprite)
    }

    /// Procedural soft glow: bright core with a quadratic falloff to transparent edges.
    pub fn glow(size: u32) -> Self {
        let size = size.max(1);
        let c = (f64::from(size) - 1.0) / 2.0;
        let radius = (f64::from(size) / 2.0).max(0.5);
        let rgba = image::RgbaImage::from_fn(size, size, |x, y| {
            let d = ((f64::from(x) - c).powi(2) + (f64::from(y) - c).powi(2)).sqrt() / radius;
            let falloff = (1.0 - d).clamp(0.0, 1.0);
            let a = (falloff * falloff * 255.0).round() as u8;
            image::Rgba([255, 250, 235, a])
        });
        Self {
            rgba,
            has_alpha: true,
        }
    }

    /// `false` when the source asset carried no transparency.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }
}
