/// Pixel rectangle `[x0, x1) × [y0, y1)` inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Region {
    pub(crate) x0: u32,
    pub(crate) y0: u32,
    pub(crate) x1: u32,
    pub(crate) y1: u32,
}

impl Region {
    /// Square of side `size` centered on `(cx, cy)`, clipped to `width × height`.
    ///
    /// Odd sizes put the extra pixel after the center, so size 1 covers exactly the center pixel.
    pub(crate) fn centered(cx: i64, cy: i64, size: u32, width: u32, height: u32) -> Self {
        let half = i64::from(size / 2);
        let tail = i64::from(size % 2);
        let clip = |v: i64, hi: u32| v.clamp(0, i64::from(hi)) as u32;
        Self {
            x0: clip(cx - half, width),
            y0: clip(cy - half, height),
            x1: clip(cx + half + tail, width),
            y1: clip(cy + half + tail, height),
        }
    }

    pub(crate) fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub(crate) fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub(crate) fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Scale every channel by `alpha`, truncating and clamping to `0..=255`.
pub(crate) fn scale_intensity(frame: &mut [u8], alpha: f64) {
    if alpha == 1.0 {
        return;
    }
    let alpha = alpha.max(0.0);
    for v in frame {
        *v = (f64::from(*v) * alpha).clamp(0.0, 255.0) as u8;
    }
}
