//! Area-style resampling on top of `fast_image_resize`.
//!
//! Shrinking uses a box convolution, so every destination pixel is the mean of its source
//! footprint. Enlarging falls back to bilinear interpolation.

use fast_image_resize as fir;

use crate::foundation::error::{NebulaError, NebulaResult};

fn resize_alg(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> fir::ResizeAlg {
    if dst_w <= src_w && dst_h <= src_h {
        fir::ResizeAlg::Convolution(fir::FilterType::Box)
    } else {
        fir::ResizeAlg::Convolution(fir::FilterType::Bilinear)
    }
}

fn resize_packed(
    src: &[u8],
    (src_w, src_h): (u32, u32),
    (dst_w, dst_h): (u32, u32),
    pixel_type: fir::PixelType,
) -> NebulaResult<Vec<u8>> {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Err(NebulaError::image_load(format!(
            "cannot resize {src_w}x{src_h} to {dst_w}x{dst_h}: zero area"
        )));
    }
    if src_w == dst_w && src_h == dst_h {
        return Ok(src.to_vec());
    }

    let src_view = fir::images::ImageRef::new(src_w, src_h, src, pixel_type)
        .map_err(|e| NebulaError::image_load(format!("resize source view: {e}")))?;
    let mut dst = fir::images::Image::new(dst_w, dst_h, pixel_type);
    let options = fir::ResizeOptions::new().resize_alg(resize_alg(src_w, src_h, dst_w, dst_h));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst, Some(&options))
        .map_err(|e| {
            NebulaError::image_load(format!(
                "resize {src_w}x{src_h} to {dst_w}x{dst_h} failed: {e}"
            ))
        })?;
    Ok(dst.into_vec())
}

/// Resize an RGB image with area averaging.
pub(crate) fn resize_rgb_area(
    src: &image::RgbImage,
    dst_w: u32,
    dst_h: u32,
) -> NebulaResult<image::RgbImage> {
    let data = resize_packed(
        src.as_raw(),
        src.dimensions(),
        (dst_w, dst_h),
        fir::PixelType::U8x3,
    )?;
    image::RgbImage::from_raw(dst_w, dst_h, data)
        .ok_or_else(|| NebulaError::image_load("resized rgb buffer has unexpected length"))
}

/// Resize a straight-alpha RGBA image with area averaging.
///
/// Colour is weighted by alpha while resampling, so transparent texels do not bleed dark
/// fringes into the result.
pub(crate) fn resize_rgba_area(
    src: &image::RgbaImage,
    dst_w: u32,
    dst_h: u32,
) -> NebulaResult<image::RgbaImage> {
    let data = resize_packed(
        src.as_raw(),
        src.dimensions(),
        (dst_w, dst_h),
        fir::PixelType::U8x4,
    )?;
    image::RgbaImage::from_raw(dst_w, dst_h, data)
        .ok_or_else(|| NebulaError::image_load("resized rgba buffer has unexpected length"))
}
