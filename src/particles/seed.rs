/// One detected bright point with its one-time random draws.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedPoint {
    /// Canvas x in pixels.
    pub x: u32,
    /// Canvas y in pixels.
    pub y: u32,
    /// Initial depth in `[0.1, 1.0]`.
    pub depth: f64,
    /// Uniform draw in `[0, 1)` mapped onto `[1, particle_size]` when the seed is activated.
    pub size_draw: f64,
}

/// An active particle as the synthesizer sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSeed {
    /// Canvas x in pixels.
    pub x: f64,
    /// Canvas y in pixels.
    pub y: f64,
    /// Initial depth.
    pub depth: f64,
    /// Sprite side length in pixels before perspective.
    pub base_size: u32,
}

/// Every seed found on a canvas, already in its final shuffled order.
///
/// Activation takes a prefix, so a smaller count is always a subset of a larger one and the
/// surviving seeds keep their positions and depths.
#[derive(Clone, Debug, Default)]
pub struct SeedPool {
    points: Vec<SeedPoint>,
}

impl SeedPool {
    pub(crate) fn new(points: Vec<SeedPoint>) -> Self {
        Self { points }
    }

    /// All seeds in shuffled order.
    pub fn points(&self) -> &[SeedPoint] {
        &self.points
    }

    /// Number of seeds in the pool.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` when the canvas had no qualifying maxima.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First `count` seeds with base sizes drawn from `[1, max_size]`.
    pub fn activate(&self, count: u32, max_size: u32) -> Vec<ParticleSeed> {
        let max_size = max_size.max(1);
        self.points
            .iter()
            .take(count as usize)
            .map(|p| ParticleSeed {
                x: f64::from(p.x),
                y: f64::from(p.y),
                depth: p.depth,
                base_size: base_size(p.size_draw, max_size),
            })
            .collect()
    }
}

fn base_size(draw: f64, max_size: u32) -> u32 {
    (1 + (draw * f64::from(max_size)) as u32).min(max_size)
}
