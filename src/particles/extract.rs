use rand::seq::SliceRandom as _;
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};

use crate::particles::seed::{SeedPoint, SeedPool};
use crate::preprocess::NormalizedCanvas;

/// Local-maximum detector settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOpts {
    /// Radius of the square max-filter; a maximum suppresses brighter-or-equal rivals within it.
    pub min_distance: u32,
    /// Minimum intensity (inclusive) for a pixel to qualify.
    pub threshold: u8,
    /// RNG seed for the one-time shuffle and per-seed draws.
    pub seed: u64,
}

impl Default for ExtractOpts {
    fn default() -> Self {
        Self {
            min_distance: 5,
            threshold: 20,
            seed: 0,
        }
    }
}

/// Rec.601 luma (`0.299 R + 0.587 G + 0.114 B`) in 14-bit fixed point, rounded.
pub(crate) fn luma_601(rgb: &image::RgbImage) -> image::GrayImage {
    image::GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let sum = u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868;
        image::Luma([((sum + (1 << 13)) >> 14) as u8])
    })
}

/// Square max-filter of radius `r`, computed as two separable 1-D passes.
pub(crate) fn dilate_square(gray: &[u8], width: usize, height: usize, r: usize) -> Vec<u8> {
    let mut rows = vec![0u8; gray.len()];
    for (src, dst) in gray.chunks_exact(width).zip(rows.chunks_exact_mut(width)) {
        for (x, out) in dst.iter_mut().enumerate() {
            let lo = x.saturating_sub(r);
            let hi = (x + r + 1).min(width);
            *out = src[lo..hi].iter().copied().max().unwrap_or(0);
        }
    }

    let mut out = vec![0u8; gray.len()];
    for y in 0..height {
        let lo = y.saturating_sub(r);
        let hi = (y + r + 1).min(height);
        for x in 0..width {
            out[y * width + x] = (lo..hi).map(|yy| rows[yy * width + x]).max().unwrap_or(0);
        }
    }
    out
}

/// Row-major coordinates of every local maximum at or above `threshold`.
pub(crate) fn local_maxima(
    gray: &[u8],
    width: usize,
    height: usize,
    min_distance: usize,
    threshold: u8,
) -> Vec<(u32, u32)> {
    let dilated = dilate_square(gray, width, height, min_distance);
    gray.iter()
        .zip(&dilated)
        .enumerate()
        .filter(|&(_, (&v, &d))| v == d && v >= threshold)
        .map(|(i, _)| ((i % width) as u32, (i / width) as u32))
        .collect()
}

/// Detect bright points on `canvas` and return them as a shuffled seed pool.
///
/// The shuffle and the per-seed depth/size draws come from a single RNG seeded with
/// `opts.seed`, so the pool is a pure function of the canvas and the options.
#[tracing::instrument(skip(canvas))]
pub fn extract(canvas: &NormalizedCanvas, opts: ExtractOpts) -> SeedPool {
    let gray = luma_601(canvas.image());
    let (w, h) = gray.dimensions();
    let mut coords = local_maxima(
        gray.as_raw(),
        w as usize,
        h as usize,
        opts.min_distance as usize,
        opts.threshold,
    );

    let mut rng = StdRng::seed_from_u64(opts.seed);
    coords.shuffle(&mut rng);

    let points = coords
        .into_iter()
        .map(|(x, y)| SeedPoint {
            x,
            y,
            depth: rng.random_range(0.1..=1.0),
            size_draw: rng.random_range(0.0..1.0),
        })
        .collect::<Vec<_>>();

    tracing::debug!(seeds = points.len(), "extracted particle seeds");
    SeedPool::new(points)
}
