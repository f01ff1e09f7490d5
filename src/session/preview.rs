use std::sync::Arc;
use std::thread::JoinHandle;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{NebulaError, NebulaResult};
use crate::render::frame::Frame;
use crate::session::snapshot::EngineSnapshot;

/// First and last frame of a clip, rendered without the fade envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewPair {
    /// Frame `0`.
    pub first: Frame,
    /// Frame `total_frames - 1`.
    pub last: Frame,
}

/// Render the preview pair on the calling thread.
pub fn render_preview_pair(snapshot: &EngineSnapshot) -> NebulaResult<PreviewPair> {
    let last = snapshot.total_frames().saturating_sub(1);
    Ok(PreviewPair {
        first: snapshot.render_frame(FrameIndex(0), false)?,
        last: snapshot.render_frame(FrameIndex(last), false)?,
    })
}

/// Handle to a preview rendering on a background thread.
#[derive(Debug)]
pub struct PreviewHandle {
    inner: JoinHandle<NebulaResult<PreviewPair>>,
}

impl PreviewHandle {
    /// `true` once the background render has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the preview.
    pub fn join(self) -> NebulaResult<PreviewPair> {
        self.inner
            .join()
            .map_err(|_| anyhow::anyhow!("preview thread panicked"))?
    }
}

/// Render the preview pair of `snapshot` on a short-lived background thread.
pub fn spawn_preview(snapshot: Arc<EngineSnapshot>) -> NebulaResult<PreviewHandle> {
    let inner = std::thread::Builder::new()
        .name("nebula-preview".to_owned())
        .spawn(move || render_preview_pair(&snapshot))
        .map_err(|e| NebulaError::Other(anyhow::anyhow!("failed to spawn preview thread: {e}")))?;
    Ok(PreviewHandle { inner })
}
