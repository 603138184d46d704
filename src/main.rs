use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crystal_entropy::camera::OrbitCamera;
use crystal_entropy::config::{ConfigFormat, SimConfig};
use crystal_entropy::driver::{BackendPreference, FrameReport, SimulationDriver, create_renderer};

/// Order/chaos particle crystal with live speed entropy.
#[derive(Parser)]
#[command(name = "crystal-entropy")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation headless and report entropy
    Run {
        /// Config file (.yaml, .yml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rendering backend (overrides the config file)
        #[arg(short, long, value_enum)]
        backend: Option<BackendPreference>,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "300")]
        frames: u64,

        /// Seconds per frame
        #[arg(long, default_value = "0.016666668")]
        dt: f32,

        /// Click every S seconds of simulated time (0 disables)
        #[arg(long, default_value = "3.0")]
        click_every: f32,

        /// Render width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Render height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Log a report every N frames (0 disables)
        #[arg(long, default_value = "60")]
        report_every: u64,

        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration
    Config {
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Final line printed by `run`
#[derive(Debug, Serialize)]
struct Summary {
    backend: &'static str,
    particles: usize,
    frames: u64,
    dropped_frames: u64,
    clicks: u64,
    #[serde(flatten)]
    last: FrameReport,
}

struct RunOptions {
    config: Option<PathBuf>,
    backend: Option<BackendPreference>,
    frames: u64,
    dt: f32,
    click_every: f32,
    width: Option<u32>,
    height: Option<u32>,
    report_every: u64,
    json: bool,
}

fn run(opts: RunOptions) -> anyhow::Result<()> {
    let mut config = match &opts.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(backend) = opts.backend {
        config.render.backend = backend;
    }
    if let Some(width) = opts.width {
        config.render.width = width;
    }
    if let Some(height) = opts.height {
        config.render.height = height;
    }
    config.validate()?;

    let renderer = create_renderer(&config.backend_settings())?;
    let mut driver =
        SimulationDriver::with_config(renderer, config.timings.clone(), config.entropy.clone());
    let camera = OrbitCamera::new(config.camera.clone());

    let mut clicks = 0u64;
    let mut next_click = opts.click_every;
    let mut last = None;

    for _ in 0..opts.frames {
        if opts.click_every > 0.0 && driver.total_time() >= next_click && driver.click() {
            clicks += 1;
            next_click = driver.total_time() + opts.click_every;
        }

        let frame = camera.frame(driver.total_time(), [0.0, 0.0]);
        let report = driver.tick(opts.dt, &frame);

        if opts.report_every > 0 && (report.frame + 1) % opts.report_every == 0 {
            info!(
                frame = report.frame,
                phase = %report.phase,
                t_order = report.t_order,
                entropy = report.entropy.entropy,
                display = report.display,
                "entropy report"
            );
        }
        last = Some(report);
    }

    let Some(last) = last else {
        println!("no frames simulated");
        return Ok(());
    };

    let summary = Summary {
        backend: driver.renderer().name(),
        particles: driver.renderer().particle_count(),
        frames: driver.frames(),
        dropped_frames: driver.dropped_frames(),
        clicks,
        last,
    };
    if opts.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "backend={} particles={} frames={} dropped={} clicks={} phase={} t_order={:.3} entropy={:.3} display={:.3}",
            summary.backend,
            summary.particles,
            summary.frames,
            summary.dropped_frames,
            summary.clicks,
            last.phase,
            last.t_order,
            last.entropy.entropy,
            last.display,
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            backend,
            frames,
            dt,
            click_every,
            width,
            height,
            report_every,
            json,
        } => run(RunOptions {
            config,
            backend,
            frames,
            dt,
            click_every,
            width,
            height,
            report_every,
            json,
        })?,
        Commands::Config { format } => {
            print!("{}", SimConfig::default().to_text(format)?);
        }
    }

    Ok(())
}
