use std::sync::mpsc;

use rayon::prelude::*;

use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{NebulaError, NebulaResult};
use crate::render::frame::Frame;
use crate::render::synth::FrameSynthesizer;
use crate::session::cancel::CancelFlag;
use crate::session::reorder::ReorderBuffer;
use crate::session::snapshot::EngineSnapshot;

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Progress callback: `(frames written, total frames)`, called after every write.
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// Options controlling how an encode renders its frames.
#[derive(Clone, Debug)]
pub struct EncodeOpts {
    /// Render frames on a dedicated rayon pool. The sink still sees strictly increasing indices.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames handed to the pool per batch.
    pub chunk_size: usize,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
    /// Apply the fade-in/fade-out envelope.
    pub fade: bool,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            chunk_size: 32,
            channel_capacity: 4,
            fade: true,
        }
    }
}

/// Encode statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Frames in the clip.
    pub frames_total: u64,
    /// Frames delivered to the sink.
    pub frames_written: u64,
}

/// Drives frame synthesis over `[0, total_frames)` and writes every frame, in order, to a sink.
#[derive(Clone, Debug, Default)]
pub struct SequentialEncoder {
    opts: EncodeOpts,
}

impl SequentialEncoder {
    /// Create an encoder.
    pub fn new(opts: EncodeOpts) -> Self {
        Self { opts }
    }

    /// Encoder options.
    pub fn opts(&self) -> &EncodeOpts {
        &self.opts
    }

    /// Render the whole clip of `snapshot` into `sink`.
    ///
    /// The sink receives frames in strictly increasing index order. `progress` runs on the
    /// encoder thread after each successful write. When `cancel` is raised the encode stops
    /// between frames with [`NebulaError::Cancelled`]. On any failure the sink is
    /// [aborted](FrameSink::abort) instead of ended; partial output is left in place.
    #[tracing::instrument(
        skip_all,
        fields(total = snapshot.total_frames(), parallel = self.opts.parallel)
    )]
    pub fn encode(
        &self,
        snapshot: &EngineSnapshot,
        sink: &mut dyn FrameSink,
        progress: &mut ProgressFn<'_>,
        cancel: Option<&CancelFlag>,
    ) -> NebulaResult<EncodeStats> {
        let total = snapshot.total_frames();
        let cfg = SinkConfig {
            canvas: snapshot.canvas(),
            fps: snapshot.params().fps,
            total_frames: total,
        };

        let bytes_per_frame = (cfg.canvas.rgb8_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = normalized_chunk_size(self.opts.chunk_size)
            .min(max_chunk_by_mem)
            .min(total.max(1));

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };

        let synth = snapshot.synthesizer();
        let fade = self.opts.fade;
        let cap = self.opts.channel_capacity.max(1);

        // Encoder thread: enforce in-order delivery to the sink regardless of render completion
        // order.
        std::thread::scope(|scope| -> NebulaResult<EncodeStats> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let sink_ref: &mut dyn FrameSink = sink;

            let enc = scope.spawn(move || -> NebulaResult<u64> {
                sink_ref.begin(cfg)?;
                match drain_in_order(sink_ref, &rx, total, progress, cancel) {
                    Ok(written) => {
                        sink_ref.end()?;
                        Ok(written)
                    }
                    Err(e) => {
                        sink_ref.abort();
                        Err(e)
                    }
                }
            });

            let ctx = ProduceCtx {
                synth,
                fade,
                cancel,
                tx: &tx,
            };
            let produce_res = match pool.as_ref() {
                Some(pool) => produce_parallel(&ctx, pool, total, chunk_size),
                None => produce_sequential(&ctx, total),
            };

            drop(tx);
            let enc_res = enc
                .join()
                .map_err(|_| NebulaError::encoder_write("encoder thread panicked"))?;

            // A render failure disconnects the channel; report the cause, not the symptom.
            if let Err(e) = produce_res {
                return Err(e);
            }
            let written = enc_res?;
            tracing::info!(frames = written, "encode finished");
            Ok(EncodeStats {
                frames_total: total,
                frames_written: written,
            })
        })
    }

    /// Encode `snapshot` into an MP4 through the system `ffmpeg`.
    pub fn encode_to_path(
        &self,
        snapshot: &EngineSnapshot,
        out: FfmpegSinkOpts,
        progress: &mut ProgressFn<'_>,
        cancel: Option<&CancelFlag>,
    ) -> NebulaResult<EncodeStats> {
        let mut sink = FfmpegSink::new(out);
        self.encode(snapshot, &mut sink, progress, cancel)
    }
}

/// Bounded-channel adapter for the progress callback.
///
/// The callback blocks when the channel is full, so the receiver has to be drained from another
/// thread while the encode runs. Progress after the receiver is dropped is discarded.
pub fn progress_channel(
    capacity: usize,
) -> (
    impl FnMut(u64, u64) + Send + 'static,
    mpsc::Receiver<(u64, u64)>,
) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let callback = move |done: u64, total: u64| {
        let _ = tx.send((done, total));
    };
    (callback, rx)
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: Frame,
}

fn drain_in_order(
    sink: &mut dyn FrameSink,
    rx: &mpsc::Receiver<FrameMsg>,
    total: u64,
    progress: &mut ProgressFn<'_>,
    cancel: Option<&CancelFlag>,
) -> NebulaResult<u64> {
    let cancelled = || cancel.is_some_and(CancelFlag::is_cancelled);
    let mut pending = ReorderBuffer::new(0);
    while pending.next() < total {
        if cancelled() {
            return Err(NebulaError::Cancelled {
                written: pending.next(),
                total,
            });
        }
        if let Some(frame) = pending.pop_ready() {
            sink.push_frame(&frame)?;
            progress(pending.next(), total);
            continue;
        }

        let msg = rx.recv().map_err(|_| {
            if cancelled() {
                NebulaError::Cancelled {
                    written: pending.next(),
                    total,
                }
            } else {
                NebulaError::encoder_write("render workers stopped before the last frame")
            }
        })?;
        pending.insert(msg.idx.0, msg.frame)?;
    }
    Ok(pending.next())
}

struct ProduceCtx<'a> {
    synth: FrameSynthesizer<'a>,
    fade: bool,
    cancel: Option<&'a CancelFlag>,
    tx: &'a mpsc::SyncSender<FrameMsg>,
}

/// Why a producer stopped early.
enum Halt {
    /// Cancelled, or the encoder thread went away; the encoder reports the outcome.
    Stop,
    Failed(NebulaError),
}

impl ProduceCtx<'_> {
    fn render_and_send(&self, tx: &mpsc::SyncSender<FrameMsg>, f: u64) -> Result<(), Halt> {
        if self.cancel.is_some_and(CancelFlag::is_cancelled) {
            return Err(Halt::Stop);
        }
        let frame = self
            .synth
            .render(FrameIndex(f), self.fade)
            .map_err(Halt::Failed)?;
        tx.send(FrameMsg {
            idx: FrameIndex(f),
            frame,
        })
        .map_err(|_| Halt::Stop)
    }
}

fn settle(res: Result<(), Halt>) -> NebulaResult<()> {
    match res {
        Ok(()) | Err(Halt::Stop) => Ok(()),
        Err(Halt::Failed(e)) => Err(e),
    }
}

fn produce_sequential(ctx: &ProduceCtx<'_>, total: u64) -> NebulaResult<()> {
    settle((0..total).try_for_each(|f| ctx.render_and_send(ctx.tx, f)))
}

fn produce_parallel(
    ctx: &ProduceCtx<'_>,
    pool: &rayon::ThreadPool,
    total: u64,
    chunk_size: u64,
) -> NebulaResult<()> {
    let mut chunk_start = 0;
    while chunk_start < total {
        let chunk_end = (chunk_start + chunk_size).min(total);
        let res = pool.install(|| {
            (chunk_start..chunk_end).into_par_iter().try_for_each_init(
                || ctx.tx.clone(),
                |tx, f| ctx.render_and_send(tx, f),
            )
        });
        if let Err(halt) = res {
            return settle(Err(halt));
        }
        chunk_start = chunk_end;
    }
    Ok(())
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> NebulaResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(NebulaError::invalid_parameter(
            "encode 'threads' must be >= 1 when set",
        ));
    }
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("nebula-render-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

#[cfg(test)]
#[path = "../../tests/unit/session/encoder.rs"]
mod tests;
