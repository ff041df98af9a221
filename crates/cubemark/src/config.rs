//! JSON configuration for a `cubemark` run.

use std::fs;
use std::path::{Path, PathBuf};

use cubemark_core::{CalibrationError, CalibrationParameters};
use cubemark_scene::{BoardDims, CubeResolver, LayoutError, LayoutTable};
use serde::{Deserialize, Serialize};

use crate::detect::{DetectError, ReplayDetector};
use crate::io::{DirectorySink, ImageSequenceSource, SinkError, SourceError};
use crate::params::OverlayParams;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Detections(#[from] DetectError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Everything needed to run the overlay over an image sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubemarkConfig {
    /// Directory holding `camera_matrix.txt` and `distortion.txt`.
    pub calibration_dir: PathBuf,
    pub frames_dir: PathBuf,
    /// Detections exported by an external marker detector.
    pub detections_path: PathBuf,
    pub output_dir: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Requested capture resolution `[width, height]`.
    pub resolution: [u32; 2],
    pub overlay: OverlayParams,
    pub board: BoardDims,
    /// Replaces the standard table built from `board`.
    pub layouts: Option<LayoutTable>,
}

impl Default for CubemarkConfig {
    fn default() -> Self {
        Self {
            calibration_dir: PathBuf::from("calibration"),
            frames_dir: PathBuf::from("frames"),
            detections_path: PathBuf::from("detections.json"),
            output_dir: PathBuf::from("out"),
            report_path: None,
            resolution: [1280, 720],
            overlay: OverlayParams::default(),
            board: BoardDims::default(),
            layouts: None,
        }
    }
}

impl CubemarkConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_calibration(&self) -> Result<CalibrationParameters, ConfigError> {
        Ok(CalibrationParameters::load_from_dir(&self.calibration_dir)?)
    }

    /// The explicit layout table if one is configured, else the standard one.
    pub fn build_layouts(&self) -> Result<LayoutTable, ConfigError> {
        match &self.layouts {
            Some(table) => {
                table.validate()?;
                Ok(table.clone())
            }
            None => Ok(LayoutTable::standard(&self.board)?),
        }
    }

    pub fn build_resolver(&self) -> Result<CubeResolver, ConfigError> {
        Ok(CubeResolver::new(
            self.build_layouts()?,
            self.overlay.marker_size,
        )?)
    }

    pub fn build_detector(&self) -> Result<ReplayDetector, ConfigError> {
        Ok(ReplayDetector::load_json(&self.detections_path)?)
    }

    pub fn build_source(&self) -> Result<ImageSequenceSource, ConfigError> {
        let [w, h] = self.resolution;
        Ok(ImageSequenceSource::open(&self.frames_dir)?.with_expected_size(w, h))
    }

    pub fn build_sink(&self) -> Result<DirectorySink, ConfigError> {
        Ok(DirectorySink::create(&self.output_dir)?)
    }
}
