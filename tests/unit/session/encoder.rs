use std::sync::{Arc, Mutex};

use super::*;
use crate::assets::decode::{ParticleSprite, SourceImage};
use crate::encode::sink::InMemorySink;
use crate::params::RenderParameters;
use crate::session::engine::{Engine, EngineOpts};

fn snapshot(fps: u32) -> Arc<EngineSnapshot> {
    let img = image::RgbImage::from_fn(48, 32, |x, y| {
        if x % 9 == 4 && y % 7 == 3 {
            image::Rgb([250, 240, 230])
        } else {
            image::Rgb([(x * 3) as u8, (y * 5) as u8, 40])
        }
    });
    let params = RenderParameters {
        particle_size: 4,
        particle_count: 20,
        duration_secs: 1.0,
        fps,
        fade_secs: 0.2,
        ..RenderParameters::default()
    };
    let opts = EngineOpts {
        preprocess: crate::preprocess::PreprocessOpts {
            pixel_budget: 1 << 20,
            target_height: 32,
        },
        ..EngineOpts::default()
    };
    Engine::new(
        &SourceImage::from_rgb(img).unwrap(),
        ParticleSprite::glow(8),
        params,
        opts,
    )
    .unwrap()
    .snapshot()
}

/// Accepts `fail_at` frames, then refuses writes.
#[derive(Default)]
struct FailingSink {
    fail_at: usize,
    pushed: usize,
    ended: bool,
    aborted: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> NebulaResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _frame: &Frame) -> NebulaResult<()> {
        if self.pushed == self.fail_at {
            return Err(NebulaError::encoder_write("disk full"));
        }
        self.pushed += 1;
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

struct RefusingSink;

impl FrameSink for RefusingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> NebulaResult<()> {
        Err(NebulaError::encoder_open("read-only filesystem"))
    }

    fn push_frame(&mut self, _frame: &Frame) -> NebulaResult<()> {
        unreachable!("push after failed begin")
    }

    fn end(&mut self) -> NebulaResult<()> {
        unreachable!("end after failed begin")
    }
}

#[test]
fn writes_every_frame_in_order_with_progress() {
    let snap = snapshot(10);
    let mut sink = InMemorySink::new();
    let mut seen = Vec::new();
    let stats = SequentialEncoder::default()
        .encode(&snap, &mut sink, &mut |d, t| seen.push((d, t)), None)
        .unwrap();

    assert_eq!(
        stats,
        EncodeStats {
            frames_total: 10,
            frames_written: 10
        }
    );
    assert_eq!(seen, (1..=10).map(|d| (d, 10)).collect::<Vec<_>>());
    assert_eq!(sink.indices(), (0..10).map(FrameIndex).collect::<Vec<_>>());
    assert!(sink.is_ended());
    assert!(!sink.is_aborted());

    let cfg = sink.config().unwrap();
    assert_eq!(cfg.fps, 10);
    assert_eq!(cfg.total_frames, 10);
    assert_eq!(cfg.canvas, snap.canvas());
}

#[test]
fn parallel_render_matches_sequential_bytes() {
    let snap = snapshot(12);
    let mut seq = InMemorySink::new();
    SequentialEncoder::default()
        .encode(&snap, &mut seq, &mut |_, _| {}, None)
        .unwrap();

    let mut par = InMemorySink::new();
    let opts = EncodeOpts {
        parallel: true,
        threads: Some(3),
        chunk_size: 5,
        channel_capacity: 2,
        ..EncodeOpts::default()
    };
    SequentialEncoder::new(opts)
        .encode(&snap, &mut par, &mut |_, _| {}, None)
        .unwrap();

    assert_eq!(seq.frames(), par.frames());
}

#[test]
fn sink_write_failure_aborts_and_surfaces() {
    let snap = snapshot(10);
    for parallel in [false, true] {
        let mut sink = FailingSink {
            fail_at: 4,
            ..FailingSink::default()
        };
        let mut calls = 0;
        let err = SequentialEncoder::new(EncodeOpts {
            parallel,
            ..EncodeOpts::default()
        })
        .encode(&snap, &mut sink, &mut |_, _| calls += 1, None)
        .unwrap_err();
        assert!(matches!(err, NebulaError::EncoderWrite(_)), "{err}");
        assert!(sink.aborted);
        assert!(!sink.ended);
        assert_eq!(calls, 4);
    }
}

#[test]
fn open_failure_is_reported_without_writes() {
    let snap = snapshot(10);
    let err = SequentialEncoder::default()
        .encode(&snap, &mut RefusingSink, &mut |_, _| {}, None)
        .unwrap_err();
    assert!(matches!(err, NebulaError::EncoderOpen(_)));
}

#[test]
fn cancel_stops_between_frames() {
    let snap = snapshot(10);
    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let mut sink = InMemorySink::new();
    let err = SequentialEncoder::default()
        .encode(
            &snap,
            &mut sink,
            &mut |done, _| {
                if done == 3 {
                    trigger.cancel();
                }
            },
            Some(&cancel),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        NebulaError::Cancelled {
            written: 3,
            total: 10
        }
    ));
    assert_eq!(sink.frames().len(), 3);
    assert!(sink.is_aborted());
}

#[test]
fn zero_threads_is_rejected() {
    let snap = snapshot(10);
    let err = SequentialEncoder::new(EncodeOpts {
        parallel: true,
        threads: Some(0),
        ..EncodeOpts::default()
    })
    .encode(&snap, &mut InMemorySink::new(), &mut |_, _| {}, None)
    .unwrap_err();
    assert!(matches!(err, NebulaError::InvalidParameter(_)));
}

#[test]
fn progress_channel_delivers_in_order() {
    let snap = snapshot(10);
    let (mut callback, rx) = progress_channel(1);
    let collected = Arc::new(Mutex::new(Vec::new()));
    let reader = {
        let collected = Arc::clone(&collected);
        std::thread::spawn(move || {
            for p in rx {
                collected.lock().unwrap().push(p);
            }
        })
    };
    SequentialEncoder::default()
        .encode(&snap, &mut InMemorySink::new(), &mut callback, None)
        .unwrap();
    drop(callback);
    reader.join().unwrap();
    let got = collected.lock().unwrap().clone();
    assert_eq!(got.last(), Some(&(10, 10)));
    assert_eq!(got.len(), 10);
}
