//! Session-oriented engine API.
//!
//! An [`Engine`](engine::Engine) front-loads preprocessing and particle extraction, then hands
//! out immutable [`EngineSnapshot`](snapshot::EngineSnapshot)s that can be rendered from any
//! thread while the engine moves on to new parameters.

/// Cooperative cancellation flag.
pub mod cancel;
/// Sequential (optionally parallel-rendered) encode into a [`FrameSink`](crate::FrameSink).
pub mod encoder;
/// Engine construction and parameter application.
pub mod engine;
/// Background first/last frame preview.
pub mod preview;
pub(crate) mod reorder;
/// Immutable render snapshot.
pub mod snapshot;
