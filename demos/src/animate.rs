#[cfg(feature = "dump_image")]
mod render;

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lloyd::dataset::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_POINTS_COUNT};
use lloyd::{ClusteringConfig, Controller, InitMethod, RunStatus, StepReport, Vec2};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Headless k-means animation: generates a point cloud and runs Lloyd's
/// algorithm on a timer, printing or rendering every step.
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Args {
    /// JSON configuration file; flags below override its values.
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub k: Option<usize>,

    /// random, farthest, kmeans++ or manual
    #[clap(long)]
    pub init: Option<InitMethod>,

    #[clap(long)]
    pub max_iterations: Option<usize>,

    #[clap(long)]
    pub tolerance: Option<f64>,

    #[clap(long)]
    pub interval_ms: Option<u64>,

    #[clap(long)]
    pub seed: Option<u64>,

    #[clap(long, default_value_t = DEFAULT_POINTS_COUNT)]
    pub points: usize,

    #[clap(long, default_value_t = DEFAULT_CANVAS_WIDTH)]
    pub width: f64,

    #[clap(long, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    pub height: f64,

    /// Manual centroid as `x,y`; repeat once per centroid.
    #[clap(long = "click", value_parser = parse_click)]
    pub clicks: Vec<Vec2>,

    /// Give up after this many seconds.
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Print every snapshot as a JSON line.
    #[clap(long, default_value_t = false)]
    pub json: bool,

    /// Write a PNG per step (needs the `dump_image` feature).
    #[clap(long)]
    pub frames_dir: Option<PathBuf>,

    #[clap(long, short, default_value_t = false)]
    pub verbose: bool,
}

fn parse_click(s: &str) -> Result<Vec2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Vec2::new(x, y))
}

fn build_config(args: &Args) -> anyhow::Result<ClusteringConfig> {
    let mut config = match &args.config {
        Some(path) => ClusteringConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClusteringConfig::default(),
    };
    if let Some(k) = args.k {
        config.k = k;
    }
    if let Some(init) = args.init {
        config.init_method = init;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(tolerance) = args.tolerance {
        config.movement_tolerance = tolerance;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.step_interval_ms = interval_ms;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

struct Frames {
    json: bool,
    #[cfg_attr(not(feature = "dump_image"), allow(dead_code))]
    dir: Option<PathBuf>,
    #[cfg_attr(not(feature = "dump_image"), allow(dead_code))]
    canvas: (f64, f64),
}

impl Frames {
    fn emit(&self, report: &StepReport) -> anyhow::Result<()> {
        if self.json {
            println!("{}", report.snapshot.to_json()?);
        }
        #[cfg(feature = "dump_image")]
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("frame-{:04}.png", report.snapshot.iteration));
            render::save_frame(&report.snapshot, self.canvas, &path)?;
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.frames_dir.is_some() && !cfg!(feature = "dump_image") {
        bail!("--frames-dir needs the `dump_image` feature");
    }
    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let config = build_config(&args)?;
    let max_iterations = config.max_iterations;
    let mut controller = Controller::new(config)?;
    controller.generate_dataset(args.points, args.width, args.height)?;
    tracing::info!(
        points = args.points,
        k = controller.config().k,
        init = %controller.config().init_method,
        "dataset generated"
    );

    if controller.config().init_method == InitMethod::Manual {
        for click in &args.clicks {
            let ack = controller.supply_manual_centroid(*click)?;
            if !ack.accepted {
                tracing::info!(x = click.x, y = click.y, "extra click ignored");
            }
        }
    } else if !args.clicks.is_empty() {
        tracing::info!("--click is only used with --init manual");
    }

    let report = controller.run(Instant::now())?;
    match report.status {
        RunStatus::Started | RunStatus::AlreadyRunning => {}
        RunStatus::AwaitingManualCentroids { remaining } => {
            bail!("manual initialization needs {remaining} more --click x,y");
        }
        RunStatus::AlreadyTerminal(reason) => {
            println!("nothing to do: {reason:?}");
            return Ok(());
        }
    }

    let frames = Frames {
        json: args.json,
        dir: args.frames_dir.clone(),
        canvas: (args.width, args.height),
    };

    let bar = ProgressBar::new(max_iterations as u64);
    let progress_style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] {wide_bar} {pos}/{len}")
        .context("progress bar template")?;
    bar.set_style(progress_style);
    bar.set_message("clustering");

    let deadline = args
        .timeout_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let frame_error = RefCell::new(None);
    let outcome = controller.run_blocking(
        || deadline.map_or(false, |d| Instant::now() >= d) || frame_error.borrow().is_some(),
        |report| {
            bar.set_position(report.snapshot.iteration as u64);
            if let Err(err) = frames.emit(report) {
                *frame_error.borrow_mut() = Some(err);
            }
        },
    );
    bar.finish_and_clear();
    if let Some(err) = frame_error.into_inner() {
        return Err(err);
    }
    let reason = outcome?;

    let snapshot = controller.snapshot();
    println!(
        "finished after {} iterations: {:?}",
        snapshot.iteration, reason
    );
    for (i, (centroid, size)) in snapshot
        .centroids
        .iter()
        .zip(snapshot.cluster_sizes())
        .enumerate()
    {
        println!(
            "cluster {i}: centre ({:.2}, {:.2}), {size} points",
            centroid.x, centroid.y
        );
    }
    Ok(())
}
