//! Marker detector seam and a replay detector backed by exported detections.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cubemark_core::MarkerObservation;
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::io::Frame;

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("failed to read detections {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid detections file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("detector failed: {0}")]
    Backend(String),
}

/// Finds markers in one frame.
///
/// Observations must come back in detection order; cube resolution follows
/// that order.
pub trait MarkerDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        gray: &GrayImage,
    ) -> Result<Vec<MarkerObservation>, DetectError>;
}

impl<F> MarkerDetector for F
where
    F: FnMut(&Frame, &GrayImage) -> Result<Vec<MarkerObservation>, DetectError>,
{
    fn detect(
        &mut self,
        frame: &Frame,
        gray: &GrayImage,
    ) -> Result<Vec<MarkerObservation>, DetectError> {
        self(frame, gray)
    }
}

/// Detections per frame name, as exported by an external detector.
///
/// ```json
/// {"frames": {"frame_0001": [{"id": 0, "corners": [[10, 10], [50, 10], [50, 50], [10, 50]]}]}}
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionLog {
    #[serde(default)]
    pub frames: BTreeMap<String, Vec<MarkerObservation>>,
}

impl DetectionLog {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DetectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DetectError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replays a [`DetectionLog`] keyed by [`Frame::name`]. Frames without an
/// entry have no detections.
#[derive(Clone, Debug, Default)]
pub struct ReplayDetector {
    log: DetectionLog,
}

impl ReplayDetector {
    pub fn new(log: DetectionLog) -> Self {
        Self { log }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let log = DetectionLog::load_json(path)?;
        log::debug!("replaying detections for {} frames", log.frames.len());
        Ok(Self::new(log))
    }

    pub fn log(&self) -> &DetectionLog {
        &self.log
    }
}

impl MarkerDetector for ReplayDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        _gray: &GrayImage,
    ) -> Result<Vec<MarkerObservation>, DetectError> {
        Ok(self.log.frames.get(&frame.name).cloned().unwrap_or_default())
    }
}
