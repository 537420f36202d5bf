use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use vecanim::{BuilderConfig, Container, Drawable, ReaderFlags, SvgEmitterOptions};

#[derive(Parser, Debug)]
#[command(name = "vecanim", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a container file into per-animation frame SVGs on disk.
    Decode(DecodeArgs),
    /// Pack a directory of per-sprite frame SVGs into deduplicated atlases.
    Atlas(AtlasArgs),
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Input container file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory frame SVGs are written to, as `<animation>_<frame>.svg`.
    #[arg(long)]
    out: PathBuf,

    /// Fail on malformed input instead of falling back to conservative
    /// defaults.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct AtlasArgs {
    /// Directory of per-sprite subdirectories, each holding frame SVGs
    /// named `<animation>_<frame-index>.svg`.
    input_directory: PathBuf,

    /// Directory atlases and manifests are written to.
    output_directory: PathBuf,

    /// Number of sprites processed concurrently (default: rayon's own
    /// choice, usually the number of hardware threads).
    #[arg(long)]
    parallel: Option<usize>,

    /// Optional JSON file overriding `BuilderConfig` defaults; missing
    /// fields fall back to their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write externalized image payloads under `<output-directory>/images`
    /// instead of inlining them as data URLs.
    #[arg(long, default_value_t = false)]
    export_images: bool,

    /// URL prefix externalized image references are rooted under.
    #[arg(long)]
    web_base_path: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Decode(args) => cmd_decode(args),
        Command::Atlas(args) => cmd_atlas(args),
    }
}

fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.in_path).with_context(|| format!("read container '{}'", args.in_path.display()))?;
    let flags = if args.strict { ReaderFlags::all() } else { ReaderFlags::empty() };
    let container = Container::decode(&bytes, flags).with_context(|| format!("decode container '{}'", args.in_path.display()))?;

    fs::create_dir_all(&args.out).with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let mut animations: Vec<(String, std::rc::Rc<vecanim::SpriteDefinition>)> = Vec::new();
    for export in &container.exports {
        match container.resolve(export.character_id)? {
            Some(Drawable::Sprite(sprite)) => animations.push((export.name.clone(), sprite)),
            Some(_) => tracing::warn!(name = %export.name, "exported asset is not a sprite, skipping"),
            None => tracing::warn!(name = %export.name, character_id = export.character_id.0, "unresolved export"),
        }
    }

    let mut frame_count = 0usize;
    if animations.is_empty() {
        let timeline = container.root_timeline()?;
        frame_count += write_animation_frames(&container, "main", &timeline, &args.out)?;
    } else {
        for (name, sprite) in &animations {
            let timeline = container.timeline_of(sprite)?;
            frame_count += write_animation_frames(&container, name, &timeline, &args.out)?;
        }
    }

    eprintln!("wrote {frame_count} frame(s) to {}", args.out.display());
    Ok(())
}

fn write_animation_frames(
    container: &Container,
    animation: &str,
    timeline: &vecanim::Timeline,
    out_dir: &std::path::Path,
) -> anyhow::Result<usize> {
    for frame in &timeline.frames {
        let svg = vecanim::render_frame_to_svg(container, frame, SvgEmitterOptions::default())
            .with_context(|| format!("render '{animation}' frame {}", frame.index.0))?;
        let path = out_dir.join(format!("{animation}_{}.svg", frame.index.0));
        fs::write(&path, svg).with_context(|| format!("write '{}'", path.display()))?;
    }
    Ok(timeline.frames.len())
}

fn cmd_atlas(args: AtlasArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("read config '{}'", path.display()))?;
            serde_json::from_str::<BuilderConfig>(&text).with_context(|| format!("parse config '{}'", path.display()))?
        }
        None => BuilderConfig::default(),
    };
    config.export_images = config.export_images || args.export_images;
    if args.web_base_path.is_some() {
        config.web_base_path = args.web_base_path.clone();
    }

    if let Some(threads) = args.parallel {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("build rayon thread pool")?;
    }

    let summary = vecanim::build_batch(&args.input_directory, &args.output_directory, &config)
        .with_context(|| format!("build atlases from '{}'", args.input_directory.display()))?;

    eprintln!(
        "built {} sprite(s), {} failed",
        summary.sprites_built,
        summary.failed_sprites.len()
    );
    for (sprite, error) in &summary.failed_sprites {
        eprintln!("  {sprite}: {error}");
    }

    if !summary.failed_sprites.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
