//! Nebula turns a single still photo into a short video: a slow camera dolly and rotation over
//! the photo, with a field of glowing particles sampled from its bright spots drifting through
//! depth.
//!
//! The public API is session-oriented:
//!
//! - Build an [`Engine`] from a [`SourceImage`], a [`ParticleSprite`] and [`RenderParameters`]
//! - Render single frames or a [`PreviewPair`] from an immutable [`EngineSnapshot`]
//! - Stream the whole clip into a [`FrameSink`] with a [`SequentialEncoder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

/// Encoding sinks.
pub mod encode;
/// Render parameter set and its JSON form.
pub mod params;
/// Bright-point particle seeds.
pub mod particles;
/// Canvas normalization.
pub mod preprocess;
pub(crate) mod raster;
/// Frame synthesis.
pub mod render;
/// Session-oriented engine API.
pub mod session;

pub use crate::foundation::core::{Affine, Canvas, FrameIndex, Point, Vec2};
pub use crate::foundation::error::{NebulaError, NebulaResult};

pub use crate::assets::decode::{ParticleSprite, SourceImage};
pub use crate::encode::ffmpeg::{
    FfmpegSink, FfmpegSinkOpts, is_encoder_available, is_ffmpeg_on_path,
};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::params::{MAX_PARTICLE_SIZE, RenderParameters};
pub use crate::particles::extract::ExtractOpts;
pub use crate::particles::seed::{ParticleSeed, SeedPoint, SeedPool};
pub use crate::preprocess::{NormalizedCanvas, PreprocessOpts};
pub use crate::render::frame::Frame;
pub use crate::session::cancel::CancelFlag;
pub use crate::session::encoder::{
    EncodeOpts, EncodeStats, ProgressFn, SequentialEncoder, progress_channel,
};
pub use crate::session::engine::{DEFAULT_GLOW_SIZE, Engine, EngineOpts};
pub use crate::session::preview::{PreviewHandle, PreviewPair, render_preview_pair, spawn_preview};
pub use crate::session::snapshot::EngineSnapshot;
