//! cubemark CLI: draw marker axes and stitched wireframe cubes over an
//! image sequence.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use cubemark::core::level_from_verbosity;
use cubemark::{run, CubemarkConfig, FrameProcessor, RunOptions};
use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "cubemark")]
#[command(about = "Overlay marker axes and wireframe cubes shared across adjacent markers")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit JSON log lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every frame of an image sequence.
    Run(RunArgs),

    /// Print the cube layout table as JSON.
    Layouts {
        /// Config whose board and layouts are used (defaults if omitted).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default config file.
    InitConfig {
        #[arg(long, default_value = "cubemark.json")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// JSON config file (defaults if omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with camera_matrix.txt and distortion.txt.
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Directory of input frames.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Detections JSON exported by the marker detector.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Directory for annotated frames.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path to write the run report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Run(args) => run_overlay(args),
        Commands::Layouts { config } => print_layouts(config),
        Commands::InitConfig { out } => {
            CubemarkConfig::default().write_json(&out)?;
            log::info!("wrote {}", out.display());
            Ok(())
        }
    }
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        LevelFilter::Warn
    } else {
        level_from_verbosity(LevelFilter::Info, cli.verbose)
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    cubemark::core::init_with_level(log_level(cli)).map_err(|e| e.to_string())?;
    if cli.log_json {
        log::warn!("--log-json needs the `tracing` feature; using plain logs");
    }
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    // the subscriber may already bridge `log` records
    let _ = tracing_log::LogTracer::init_with_filter(log_level(cli));
    cubemark::core::init_tracing(cli.log_json);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> CliResult<CubemarkConfig> {
    match path {
        Some(path) => {
            log::debug!("loading config {}", path.display());
            Ok(CubemarkConfig::load_json(path)?)
        }
        None => Ok(CubemarkConfig::default()),
    }
}

fn run_overlay(args: RunArgs) -> CliResult<()> {
    let mut cfg = load_config(args.config.as_ref())?;
    if let Some(dir) = args.calibration {
        cfg.calibration_dir = dir;
    }
    if let Some(dir) = args.frames {
        cfg.frames_dir = dir;
    }
    if let Some(path) = args.detections {
        cfg.detections_path = path;
    }
    if let Some(dir) = args.output {
        cfg.output_dir = dir;
    }
    if args.report.is_some() {
        cfg.report_path = args.report;
    }

    let mut processor = FrameProcessor::new(
        cfg.build_detector()?,
        cfg.build_calibration()?,
        cfg.build_resolver()?,
        cfg.overlay.clone(),
    );
    let mut source = cfg.build_source()?;
    let mut sink = cfg.build_sink()?;
    let options = RunOptions {
        max_frames: args.max_frames,
    };

    let report = run(&mut source, &mut sink, &mut processor, &options)?;
    if let Some(path) = &cfg.report_path {
        report.write_json(path)?;
        log::info!("wrote report {}", path.display());
    }
    println!(
        "{} frames written to {} ({} with cubes)",
        report.frames_processed,
        cfg.output_dir.display(),
        report.frames_with_cubes()
    );
    Ok(())
}

fn print_layouts(config: Option<PathBuf>) -> CliResult<()> {
    let cfg = load_config(config.as_ref())?;
    let table = cfg.build_layouts()?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
