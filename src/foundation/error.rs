/// Crate-wide result alias.
pub type NebulaResult<T> = Result<T, NebulaError>;

/// Error taxonomy for engine construction, frame synthesis, and encoding.
#[derive(thiserror::Error, Debug)]
pub enum NebulaError {
    /// Source photo or particle sprite could not be read or decoded, or has zero area.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A render parameter is out of its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A frame was requested outside `[0, total)`.
    #[error("invalid frame index {index} (valid range is [0, {total}))")]
    InvalidFrameIndex {
        /// Requested index.
        index: u64,
        /// Total frame count of the clip.
        total: u64,
    },

    /// The video sink could not be created.
    #[error("encoder open error: {0}")]
    EncoderOpen(String),

    /// A write into an open video sink failed.
    #[error("encoder write error: {0}")]
    EncoderWrite(String),

    /// An encode observed its cancel flag between frames.
    #[error("encode cancelled after {written} of {total} frames")]
    Cancelled {
        /// Frames already written to the sink.
        written: u64,
        /// Frames requested.
        total: u64,
    },

    /// Anything else, with context attached by `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NebulaError {
    /// Build an [`NebulaError::ImageLoad`].
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Build an [`NebulaError::InvalidParameter`].
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Build an [`NebulaError::EncoderOpen`].
    pub fn encoder_open(msg: impl Into<String>) -> Self {
        Self::EncoderOpen(msg.into())
    }

    /// Build an [`NebulaError::EncoderWrite`].
    pub fn encoder_write(msg: impl Into<String>) -> Self {
        Self::EncoderWrite(msg.into())
    }
}
