use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{NebulaError, NebulaResult};

/// A rendered frame as tightly packed, row-major RGB8 pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Position in the clip.
    pub index: FrameIndex,
    /// Clip time in seconds (`index / fps`).
    pub time_secs: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGB8 bytes.
    pub data: Vec<u8>,
}

impl Frame {
    /// Frame dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Copy the pixels into an [`image::RgbImage`].
    pub fn to_image(&self) -> NebulaResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| NebulaError::image_load("frame data does not match its dimensions"))
    }

    /// Write the frame as a PNG, creating the parent directory when missing.
    pub fn save_png(&self, path: impl AsRef<Path>) -> NebulaResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}
