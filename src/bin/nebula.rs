use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nebula", version, about = "Turn a still photo into a parallax particle video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render the first and last frame (no fade) as PNGs.
    Preview(PreviewArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Write the default parameter set as JSON.
    Params(ParamsArgs),
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Source photo.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Particle sprite (PNG with alpha). Defaults to a built-in soft glow.
    #[arg(long)]
    sprite: Option<PathBuf>,

    /// Parameter set JSON. Defaults are used when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Seed for particle ordering and depth/size draws.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Apply the fade-in/fade-out envelope.
    #[arg(long)]
    fade: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output directory for `first.png` and `last.png`.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Render frames in parallel (output order is unchanged).
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`. Defaults to one per core.
    #[arg(long)]
    threads: Option<usize>,

    /// Target video bitrate in kbit/s.
    #[arg(long)]
    bitrate_kbps: Option<u32>,

    /// Disable the fade-in/fade-out envelope.
    #[arg(long)]
    no_fade: bool,
}

#[derive(Args, Debug)]
struct ParamsArgs {
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Render(args) => cmd_render(args),
        Command::Params(args) => cmd_params(args),
    }
}

fn load_params(path: Option<&Path>) -> anyhow::Result<nebula::RenderParameters> {
    match path {
        Some(p) => nebula::RenderParameters::from_path(p)
            .with_context(|| format!("load parameters '{}'", p.display())),
        None => Ok(nebula::RenderParameters::default()),
    }
}

fn build_engine(args: &EngineArgs) -> anyhow::Result<nebula::Engine> {
    let params = load_params(args.params.as_deref())?;
    let opts = nebula::EngineOpts {
        extract: nebula::ExtractOpts {
            seed: args.seed,
            ..nebula::ExtractOpts::default()
        },
        ..nebula::EngineOpts::default()
    };
    let engine = nebula::Engine::from_paths(&args.in_path, args.sprite.as_deref(), params, opts)
        .with_context(|| format!("prepare '{}'", args.in_path.display()))?;
    Ok(engine)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let engine = build_engine(&args.engine)?;
    let frame = engine.render_frame(nebula::FrameIndex(args.frame), args.fade)?;
    frame.save_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let engine = build_engine(&args.engine)?;
    let pair = nebula::spawn_preview(engine.snapshot())?.join()?;
    for (name, frame) in [("first.png", &pair.first), ("last.png", &pair.last)] {
        let out = args.out_dir.join(name);
        frame.save_png(&out)?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let engine = build_engine(&args.engine)?;
    let snapshot = engine.snapshot();

    let encoder = nebula::SequentialEncoder::new(nebula::EncodeOpts {
        parallel: args.parallel,
        threads: args.threads,
        fade: !args.no_fade,
        ..nebula::EncodeOpts::default()
    });
    let out = nebula::FfmpegSinkOpts {
        bitrate_kbps: args.bitrate_kbps,
        ..nebula::FfmpegSinkOpts::new(&args.out)
    };

    let started = std::time::Instant::now();
    let mut last_pct = None;
    let stats = encoder.encode_to_path(
        &snapshot,
        out,
        &mut |done, total| {
            let pct = done * 100 / total.max(1);
            if last_pct != Some(pct / 10) {
                last_pct = Some(pct / 10);
                tracing::info!(done, total, "encoding {pct}%");
            }
        },
        None,
    )?;

    tracing::info!(
        frames = stats.frames_written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "render complete"
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_params(args: ParamsArgs) -> anyhow::Result<()> {
    nebula::RenderParameters::default().to_path(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
