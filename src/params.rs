//! Render parameters and their JSON persistence.
//!
//! The on-disk shape is a flat object using the historical key names (`rotate`, `particle_num`,
//! `duration`, ...). `fade`, `fps` and `camera_drift` are optional and fall back to defaults.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{NebulaError, NebulaResult};

/// Largest accepted `particle_size`, in pixels.
pub const MAX_PARTICLE_SIZE: u32 = 256;

/// Camera and particle motion controls for one render.
///
/// Values are plain data; derived quantities (`total_frames`, `fade_frames`) are computed on
/// demand so a parameter set can never disagree with itself.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderParameters {
    /// Initial zoom offset; each unit adds 10% to the background scale.
    pub z_init: f64,
    /// Zoom direction, `1` (in) or `-1` (out).
    pub z_dir: i32,
    /// Background zoom speed.
    pub speed: f64,
    /// Background rotation over the whole clip, in degrees.
    #[serde(rename = "rotate")]
    pub rotate_degrees: f64,
    /// Particle depth direction, `1` or `-1`.
    pub particle_dir: i32,
    /// Upper bound for a particle's base sprite size in pixels.
    pub particle_size: u32,
    /// Number of active particles (capped by the seeds found in the photo).
    #[serde(rename = "particle_num")]
    pub particle_count: u32,
    /// Particle field rotation over the whole clip, in degrees.
    #[serde(rename = "particle_rotate")]
    pub particle_rotate_degrees: f64,
    /// Particle depth speed.
    pub particle_speed: f64,
    /// Clip length in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// Fade-in/fade-out length in seconds; `0` disables the envelope.
    #[serde(rename = "fade", default = "default_fade_secs")]
    pub fade_secs: f64,
    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Optional background drift in pixels per second (scaled by `speed`). Zero keeps the
    /// transform a pure rotation + zoom about the canvas center.
    #[serde(default, skip_serializing_if = "is_zero_drift")]
    pub camera_drift: [f64; 2],
}

fn default_fade_secs() -> f64 {
    1.0
}

fn default_fps() -> u32 {
    30
}

fn is_zero_drift(v: &[f64; 2]) -> bool {
    v[0] == 0.0 && v[1] == 0.0
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            z_init: 3.0,
            z_dir: -1,
            speed: 1.0,
            rotate_degrees: -5.0,
            particle_dir: -1,
            particle_size: 16,
            particle_count: 1000,
            particle_rotate_degrees: -4.0,
            particle_speed: 3.0,
            duration_secs: 15.0,
            fade_secs: default_fade_secs(),
            fps: default_fps(),
            camera_drift: [0.0, 0.0],
        }
    }
}

impl RenderParameters {
    /// Parse a parameter set from a JSON reader and validate it.
    pub fn from_reader<R: std::io::Read>(r: R) -> NebulaResult<Self> {
        let params: Self = serde_json::from_reader(r)
            .map_err(|e| NebulaError::invalid_parameter(format!("parse parameter JSON: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Parse a parameter set from a JSON file on disk and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> NebulaResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            NebulaError::invalid_parameter(format!(
                "open parameter JSON '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Write the parameter set as pretty JSON.
    pub fn to_path(&self, path: impl AsRef<Path>) -> NebulaResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parameter dir '{}'", parent.display()))?;
        }
        let f = File::create(path)
            .with_context(|| format!("create parameter JSON '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)
            .with_context(|| format!("write parameter JSON '{}'", path.display()))?;
        w.flush()
            .with_context(|| format!("flush parameter JSON '{}'", path.display()))?;
        Ok(())
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> NebulaResult<()> {
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(NebulaError::invalid_parameter("duration must be > 0"));
        }
        if self.fps == 0 {
            return Err(NebulaError::invalid_parameter("fps must be > 0"));
        }
        if self.particle_count == 0 {
            return Err(NebulaError::invalid_parameter("particle_num must be > 0"));
        }
        if self.particle_size == 0 || self.particle_size > MAX_PARTICLE_SIZE {
            return Err(NebulaError::invalid_parameter(format!(
                "particle_size must be in 1..={MAX_PARTICLE_SIZE}, got {}",
                self.particle_size
            )));
        }
        if !matches!(self.z_dir, -1 | 1) {
            return Err(NebulaError::invalid_parameter(format!(
                "z_dir must be -1 or 1, got {}",
                self.z_dir
            )));
        }
        if !matches!(self.particle_dir, -1 | 1) {
            return Err(NebulaError::invalid_parameter(format!(
                "particle_dir must be -1 or 1, got {}",
                self.particle_dir
            )));
        }
        if !(self.fade_secs.is_finite() && self.fade_secs >= 0.0) {
            return Err(NebulaError::invalid_parameter("fade must be >= 0"));
        }
        let finite = [
            ("z_init", self.z_init),
            ("speed", self.speed),
            ("rotate", self.rotate_degrees),
            ("particle_rotate", self.particle_rotate_degrees),
            ("particle_speed", self.particle_speed),
            ("camera_drift[0]", self.camera_drift[0]),
            ("camera_drift[1]", self.camera_drift[1]),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(NebulaError::invalid_parameter(format!(
                    "{name} must be finite"
                )));
            }
        }
        if self.total_frames() == 0 {
            return Err(NebulaError::invalid_parameter(
                "duration * fps must round to at least one frame",
            ));
        }
        Ok(())
    }

    /// `round(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * f64::from(self.fps)).round().max(0.0) as u64
    }

    /// `round(fade * fps)`; zero disables the fade envelope.
    pub fn fade_frames(&self) -> u64 {
        (self.fade_secs * f64::from(self.fps)).round().max(0.0) as u64
    }

    /// Clip time of a frame in seconds.
    pub fn frame_time_secs(&self, frame: u64) -> f64 {
        frame as f64 / f64::from(self.fps)
    }

    /// `true` when switching from `self` to `other` requires rebuilding the active particle set.
    pub fn particles_differ(&self, other: &Self) -> bool {
        self.particle_size != other.particle_size || self.particle_count != other.particle_count
    }
}
