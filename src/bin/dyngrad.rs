use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use dyngrad::{
    Clock as _, Color, DynamicGradient, EffectOptions, FixedClock, GradientOptions, GradientUpdate,
    PaletteSection, ScheduleEntry, Stage, SystemClock, TimeOfDay, clock, palette, schedule,
};

const TARGET: &str = "#gradient";

#[derive(Parser, Debug)]
#[command(name = "dyngrad", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a time-of-day palette and print the blended colors as JSON.
    Palette(PaletteArgs),
    /// Print the schedule entry active at a given time as JSON.
    Active(ActiveArgs),
    /// Simulate a gradient on a raster surface and write PNG frames.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct PaletteArgs {
    /// JSON array of palette sections.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Fractional hour (e.g. 18.5). Defaults to the current local time.
    #[arg(long)]
    hour: Option<f64>,
}

#[derive(Parser, Debug)]
struct ActiveArgs {
    /// Gradient options JSON containing a `schedule`.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Time of day as HH:MM. Defaults to the current local time.
    #[arg(long)]
    at: Option<TimeOfDay>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Gradient options JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for numbered PNG frames.
    #[arg(long)]
    out: PathBuf,

    /// JSON array of `{ "at_ms": .., "action": .. }` steps.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(long, default_value_t = 4000)]
    duration_ms: u64,

    #[arg(long, default_value_t = 10)]
    fps: u32,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 180)]
    height: u32,

    /// Simulated time of day at the first frame. Defaults to the current local time.
    #[arg(long)]
    at: Option<TimeOfDay>,

    /// Simulated minutes that pass per rendered second.
    #[arg(long, default_value_t = 0)]
    minutes_per_second: u64,

    /// Grayscale PNG used as the glyph mask in text-clip mode.
    #[arg(long)]
    text_mask: Option<PathBuf>,
}

#[derive(serde::Deserialize, Debug)]
struct ScriptStep {
    at_ms: u64,
    #[serde(flatten)]
    action: Action,
}

#[derive(serde::Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    SetGradient(GradientUpdate),
    Schedule {
        entries: Vec<ScheduleEntry>,
    },
    TriggerEffect(EffectOptions),
    PersistEffect {
        colors: Vec<Color>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    StopEffects,
    SetTextClip {
        enabled: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Palette(args) => cmd_palette(args),
        Command::Active(args) => cmd_active(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse {what} JSON '{}'", path.display()))?;
    Ok(value)
}

fn cmd_palette(args: PaletteArgs) -> anyhow::Result<()> {
    let sections: Vec<PaletteSection> = read_json(&args.in_path, "palette sections")?;
    let hour = args.hour.unwrap_or_else(clock::local_hour);
    let Some(blend) = palette::resolve(&sections, hour) else {
        anyhow::bail!("'{}' contains no palette sections", args.in_path.display());
    };

    let out = serde_json::json!({
        "clock": clock::hour_to_clock(hour),
        "top": blend.top,
        "mid": blend.mid,
        "bottom": blend.bottom,
        "gradient": blend.to_descriptor().to_css(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_active(args: ActiveArgs) -> anyhow::Result<()> {
    let options: GradientOptions = read_json(&args.in_path, "gradient options")?;
    let at = args.at.unwrap_or_else(|| SystemClock.time_of_day());
    let entries = schedule::normalize(&options.schedule);
    let active = schedule::active_entry(&entries, at);
    println!("{}", serde_json::to_string_pretty(&active)?);
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if args.fps == 0 {
        anyhow::bail!("--fps must be > 0");
    }
    let options: GradientOptions = read_json(&args.in_path, "gradient options")?;
    let mut script: Vec<ScriptStep> = match &args.script {
        Some(path) => read_json(path, "script")?,
        None => Vec::new(),
    };
    script.sort_by_key(|s| s.at_ms);

    let mut stage = Stage::new();
    let surface = stage.add(TARGET.trim_start_matches('#'));
    if let Some(path) = &args.text_mask {
        let mask = image::open(path)
            .with_context(|| format!("open text mask '{}'", path.display()))?
            .to_luma8();
        surface.set_text_mask(mask);
    }

    let start = args.at.unwrap_or_else(|| SystemClock.time_of_day());
    let clock = FixedClock::new(start);
    let mut gradient = DynamicGradient::init_in(&stage, TARGET, options, clock.clone())?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let frame_ms = 1000 / u64::from(args.fps);
    let frames = args.duration_ms / frame_ms.max(1) + 1;
    let mut steps = script.into_iter().peekable();

    for frame in 0..frames {
        let t = frame * frame_ms;

        while let Some(step) = steps.next_if(|s| s.at_ms <= t) {
            gradient.advance_with(step.at_ms, |due| stage.set_time(due));
            stage.set_time(step.at_ms);
            tracing::info!(at_ms = step.at_ms, action = ?step.action, "script step");
            apply(&mut gradient, step.action);
        }

        gradient.advance_with(t, |due| stage.set_time(due));
        stage.set_time(t);
        if args.minutes_per_second > 0 {
            clock.set(start.plus_minutes(t * args.minutes_per_second / 1000));
            gradient.check_schedule();
        }
        gradient.render_frame();

        let img = surface.render(args.width, args.height)?;
        let path = args.out.join(format!("frame_{frame:05}.png"));
        img.save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
    }

    gradient.dispose();
    eprintln!("wrote {frames} frames to {}", args.out.display());
    Ok(())
}

fn apply(gradient: &mut DynamicGradient<dyngrad::RasterSurface, FixedClock>, action: Action) {
    match action {
        Action::SetGradient(update) => gradient.set_gradient(update),
        Action::Schedule { entries } => gradient.schedule(&entries),
        Action::TriggerEffect(options) => gradient.trigger_effect(options),
        Action::PersistEffect {
            colors,
            duration_ms,
        } => gradient.persist_effect(&colors, duration_ms.map(Duration::from_millis)),
        Action::StopEffects => gradient.stop_effects(),
        Action::SetTextClip { enabled } => gradient.set_text_clip(enabled),
    }
}
