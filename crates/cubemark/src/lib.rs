//! Facade crate for the `cubemark-*` workspace.
//!
//! `cubemark` detects fiducial markers frame by frame, estimates each
//! marker's pose, draws its axes, and draws a wireframe cube whose vertical
//! edges are shared between adjacent markers seen in the same frame.
//!
//! This crate provides:
//! - re-exports of the geometry ([`core`]), cube layout ([`scene`]) and
//!   drawing ([`render`]) crates
//! - the detector and pose-estimator seams ([`MarkerDetector`],
//!   [`PoseEstimator`])
//! - the per-frame pipeline ([`FrameProcessor`]) and the frame loop
//!   ([`run`]) over pluggable frame sources and sinks
//! - JSON configuration ([`CubemarkConfig`]) and the `cubemark` binary
//!   (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use cubemark::{run, CubemarkConfig, FrameProcessor, RunOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = CubemarkConfig::load_json("cubemark.json")?;
//! let mut processor = FrameProcessor::new(
//!     cfg.build_detector()?,
//!     cfg.build_calibration()?,
//!     cfg.build_resolver()?,
//!     cfg.overlay.clone(),
//! );
//! let mut source = cfg.build_source()?;
//! let mut sink = cfg.build_sink()?;
//! let report = run(&mut source, &mut sink, &mut processor, &RunOptions::default())?;
//! println!("{} frames", report.frames_processed);
//! # Ok(())
//! # }
//! ```

pub use cubemark_core as core;
pub use cubemark_render as render;
pub use cubemark_scene as scene;

pub use cubemark_core::{
    CalibrationParameters, MarkerId, MarkerObservation, MarkerPose, PixelPoint,
};
pub use cubemark_scene::{
    BoardDims, CornerCache, CubeResolver, LayoutTable, RegistrationMode, ResolvedCube,
};

mod config;
mod detect;
mod io;
mod params;
mod pipeline;
mod pose;
mod run;

pub use config::{ConfigError, CubemarkConfig};
pub use detect::{DetectError, DetectionLog, MarkerDetector, ReplayDetector};
pub use io::{
    DirectorySink, Frame, FrameSink, FrameSource, ImageSequenceSource, LoopControl, SinkError,
    SourceError,
};
pub use params::{CubeSelection, OverlayParams};
pub use pipeline::{
    FrameOutput, FrameProcessor, FrameReport, MarkerReport, SkipStage, SkippedMarker,
};
pub use pose::{PlanarPoseEstimator, PoseEstimator};
pub use run::{run, ReportIoError, RunError, RunOptions, RunReport};
