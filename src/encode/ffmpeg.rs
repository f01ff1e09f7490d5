use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{NebulaError, NebulaResult};
use crate::render::frame::Frame;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// `ffmpeg` video encoder name.
    pub video_codec: String,
    /// Optional target bitrate hint in kbit/s (`-b:v`).
    pub bitrate_kbps: Option<u32>,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            video_codec: "libx264".to_owned(),
            bitrate_kbps: None,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGB frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }

    /// Close stdin, reap the child and collect its stderr.
    fn finish_child(&mut self) -> NebulaResult<(std::process::ExitStatus, Vec<u8>)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| NebulaError::encoder_write("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            NebulaError::encoder_write(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| NebulaError::encoder_write("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| NebulaError::encoder_write(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.cfg = None;
        Ok((status, stderr_bytes))
    }
}

/// Command-line arguments for one encode (everything after the program name).
///
/// `begin` has already created the output file under the overwrite policy, so `ffmpeg` is
/// always told to overwrite it.
pub(crate) fn ffmpeg_args(cfg: &SinkConfig, opts: &FfmpegSinkOpts) -> Vec<OsString> {
    let size = format!("{}x{}", cfg.canvas.width, cfg.canvas.height);
    let fps = cfg.fps.to_string();

    // Input: raw packed RGB frames at the clip rate.
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        size.as_str(),
        "-r",
        fps.as_str(),
        "-i",
        "pipe:0",
        "-an",
        "-c:v",
        opts.video_codec.as_str(),
        "-pix_fmt",
        "yuv420p",
    ]
    .map(OsString::from)
    .into();
    if let Some(kbps) = opts.bitrate_kbps {
        args.push("-b:v".into());
        args.push(format!("{kbps}k").into());
    }
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(opts.out_path.clone().into_os_string());
    args
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> NebulaResult<()> {
        if cfg.fps == 0 {
            return Err(NebulaError::encoder_open("fps must be non-zero"));
        }
        if cfg.canvas.width == 0 || cfg.canvas.height == 0 {
            return Err(NebulaError::encoder_open(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.canvas.width.is_multiple_of(2) || !cfg.canvas.height.is_multiple_of(2) {
            return Err(NebulaError::encoder_open(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(NebulaError::encoder_open(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(NebulaError::encoder_open(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        if !is_encoder_available(&self.opts.video_codec) {
            return Err(NebulaError::encoder_open(format!(
                "ffmpeg has no video encoder named '{}'",
                self.opts.video_codec
            )));
        }
        create_output_file(&self.opts.out_path, self.opts.overwrite)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(ffmpeg_args(&cfg, &self.opts));

        tracing::debug!(out = %self.opts.out_path.display(), ?cmd, "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            NebulaError::encoder_open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| NebulaError::encoder_open("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| NebulaError::encoder_open("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> NebulaResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| NebulaError::encoder_write("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && frame.index.0 <= last.0
        {
            return Err(NebulaError::encoder_write(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(frame.index);

        if frame.canvas() != cfg.canvas {
            return Err(NebulaError::encoder_write(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        if frame.data.len() != cfg.canvas.rgb8_len() {
            return Err(NebulaError::encoder_write(
                "frame.data size mismatch with width*height*3",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(NebulaError::encoder_write("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            NebulaError::encoder_write(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> NebulaResult<()> {
        let (status, stderr_bytes) = self.finish_child()?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(NebulaError::encoder_write(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        if self.child.is_none() {
            return;
        }
        match self.finish_child() {
            Ok((status, stderr)) => tracing::warn!(
                %status,
                stderr = %String::from_utf8_lossy(&stderr).trim(),
                out = %self.opts.out_path.display(),
                "ffmpeg sink aborted; partial output left in place"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to release ffmpeg sink"),
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> NebulaResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            NebulaError::encoder_open(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Create (or truncate) the output file so an unwritable path fails before `ffmpeg` starts.
fn create_output_file(path: &Path, overwrite: bool) -> NebulaResult<()> {
    let mut open = std::fs::OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    open.open(path).map(drop).map_err(|e| {
        NebulaError::encoder_open(format!(
            "cannot open output file '{}': {e}",
            path.display()
        ))
    })
}

/// Return `true` when the `ffmpeg` on `PATH` has a video encoder called `name`.
///
/// Asks `ffmpeg -h encoder=<name>`, which prints an `Encoder <name> [...]` header only for
/// encoders the build actually contains.
pub fn is_encoder_available(name: &str) -> bool {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-h"])
        .arg(format!("encoder={name}"))
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();
    match out {
        Ok(out) => {
            let help = String::from_utf8_lossy(&out.stdout);
            out.status.success()
                && !help.contains("Unknown encoder")
                && help.contains(&format!("Encoder {name} "))
        }
        Err(_) => false,
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
