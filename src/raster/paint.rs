//! Frame rasterization through `vello_cpu`.
//!
//! Every frame starts as an opaque black pixmap. Image layers are drawn onto it as transformed
//! rectangles filled with an image paint, then the pixmap is read back as packed RGB8.

use std::sync::Arc;

use kurbo::Affine;

use crate::foundation::core::Canvas;
use crate::foundation::error::{NebulaError, NebulaResult};

/// An image uploaded as a `vello_cpu` paint, with its pixel size.
///
/// Cloning shares the pixel data.
#[derive(Clone)]
pub(crate) struct ImageLayer {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for ImageLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLayer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl ImageLayer {
    /// Upload an opaque RGB image.
    pub(crate) fn from_rgb(img: &image::RgbImage) -> NebulaResult<Self> {
        let pixels = img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                vello_cpu::peniko::color::PremulRgba8::from_u8_array([r, g, b, 255])
            })
            .collect();
        Self::from_premul(pixels, img.width(), img.height(), false)
    }

    /// Upload a straight-alpha RGBA image.
    pub(crate) fn from_rgba(img: &image::RgbaImage) -> NebulaResult<Self> {
        let pixels = img.pixels().map(|p| premultiply(p.0)).collect();
        Self::from_premul(pixels, img.width(), img.height(), true)
    }

    fn from_premul(
        pixels: Vec<vello_cpu::peniko::color::PremulRgba8>,
        width: u32,
        height: u32,
        may_have_opacities: bool,
    ) -> NebulaResult<Self> {
        let (w, h) = pixmap_dims(width, height)?;
        let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width,
            height,
        })
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }
}

fn premultiply([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::color::PremulRgba8 {
    let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
    vello_cpu::peniko::color::PremulRgba8::from_u8_array([mul(r), mul(g), mul(b), a])
}

fn pixmap_dims(width: u32, height: u32) -> NebulaResult<(u16, u16)> {
    let w: u16 = width.try_into().map_err(|_| {
        NebulaError::invalid_parameter(format!("raster width {width} exceeds {}", u16::MAX))
    })?;
    let h: u16 = height.try_into().map_err(|_| {
        NebulaError::invalid_parameter(format!("raster height {height} exceeds {}", u16::MAX))
    })?;
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// Paints one frame: black backdrop, then image layers in call order with source-over.
pub(crate) struct FramePainter {
    ctx: vello_cpu::RenderContext,
    width: u16,
    height: u16,
}

impl FramePainter {
    pub(crate) fn new(canvas: Canvas) -> NebulaResult<Self> {
        let (width, height) = pixmap_dims(canvas.width, canvas.height)?;
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));
        Ok(Self { ctx, width, height })
    }

    /// Draw `layer` with its pixel grid mapped onto the frame through `transform`.
    ///
    /// Samples are bilinear; frame pixels the layer does not cover keep what is under them.
    pub(crate) fn draw(&mut self, layer: &ImageLayer, transform: Affine) {
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(layer.paint.clone());
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(layer.width()),
            f64::from(layer.height()),
        ));
    }

    /// Rasterize everything drawn so far into packed RGB8.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.render_to_pixmap(&mut pixmap);
        // The backdrop is opaque, so premultiplied channels are already the straight values.
        pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }
}
