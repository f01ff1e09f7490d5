use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::NebulaResult;
use crate::render::frame::Frame;

/// Configuration provided to a [`FrameSink`] at the start of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Frame size in pixels.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: u32,
    /// Number of frames that will be pushed.
    pub total_frames: u64,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order. After a
/// successful `begin`, exactly one of `end` (success) or `abort` (failure) is called.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> NebulaResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, frame: &Frame) -> NebulaResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> NebulaResult<()>;
    /// Release resources after a failed encode. Partial output is left in place.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<Frame>,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Indices of the captured frames, in push order.
    pub fn indices(&self) -> Vec<FrameIndex> {
        self.frames.iter().map(|f| f.index).collect()
    }

    /// `true` once `end` has run.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// `true` once `abort` has run.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> NebulaResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> NebulaResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> NebulaResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
