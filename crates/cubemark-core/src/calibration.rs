//! Camera calibration parameters and their plain-text loader.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::distortion::SUPPORTED_DISTORTION_LENGTHS;
use crate::projection::ProjectionError;

/// File name of the intrinsic matrix inside a calibration directory.
pub const CAMERA_MATRIX_FILE: &str = "camera_matrix.txt";
/// File name of the distortion vector inside a calibration directory.
pub const DISTORTION_FILE: &str = "distortion.txt";

/// Errors raised while loading or validating calibration data.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}:{line}: cannot parse `{token}` as a number")]
    Parse {
        file: String,
        line: usize,
        token: String,
    },
    #[error("{file}: expected {expected}, got {got}")]
    Shape {
        file: String,
        expected: &'static str,
        got: String,
    },
    #[error("distortion vector has {0} coefficients (supported: 0, 4, 5 or 8)")]
    DistortionLength(usize),
    #[error(transparent)]
    Degenerate(#[from] ProjectionError),
}

/// Pinhole intrinsics extracted from the 3x3 camera matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
}

impl Intrinsics {
    /// Map (distorted) normalized coordinates to pixels.
    #[inline]
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (self.fx * x + self.skew * y + self.cx, self.fy * y + self.cy)
    }

    /// Map pixels back to (distorted) normalized coordinates.
    #[inline]
    pub fn to_normalized(&self, u: f64, v: f64) -> (f64, f64) {
        let y = (v - self.cy) / self.fy;
        let x = (u - self.cx - self.skew * y) / self.fx;
        (x, y)
    }
}

/// Camera intrinsic matrix and lens distortion coefficients.
///
/// Distortion coefficients follow the OpenCV order
/// `k1 k2 p1 p2 [k3 [k4 k5 k6]]`. Loaded once and shared read-only by every
/// frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub camera_matrix: Matrix3<f64>,
    #[serde(default)]
    pub distortion: Vec<f64>,
}

impl CalibrationParameters {
    /// Validate and build calibration parameters.
    pub fn new(
        camera_matrix: Matrix3<f64>,
        distortion: Vec<f64>,
    ) -> Result<Self, CalibrationError> {
        let calib = Self {
            camera_matrix,
            distortion,
        };
        calib.validate()?;
        Ok(calib)
    }

    /// Distortion-free pinhole camera. Not validated.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            camera_matrix: Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
            distortion: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.intrinsics()?;
        if !SUPPORTED_DISTORTION_LENGTHS.contains(&self.distortion.len()) {
            return Err(CalibrationError::DistortionLength(self.distortion.len()));
        }
        if self.distortion.iter().any(|d| !d.is_finite()) {
            return Err(ProjectionError::NonFiniteCalibration.into());
        }
        Ok(())
    }

    /// Extract the pinhole intrinsics, rejecting degenerate matrices.
    pub fn intrinsics(&self) -> Result<Intrinsics, ProjectionError> {
        let k = &self.camera_matrix;
        if k.iter().any(|v| !v.is_finite()) {
            return Err(ProjectionError::NonFiniteCalibration);
        }
        let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
        if fx.abs() < f64::EPSILON || fy.abs() < f64::EPSILON {
            return Err(ProjectionError::DegenerateIntrinsics { fx, fy });
        }
        if k.try_inverse().is_none() {
            return Err(ProjectionError::SingularCameraMatrix);
        }
        Ok(Intrinsics {
            fx,
            fy,
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        })
    }

    /// Load `camera_matrix.txt` and `distortion.txt` from a directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let dir = dir.as_ref();
        let matrix_path = dir.join(CAMERA_MATRIX_FILE);
        let distortion_path = dir.join(DISTORTION_FILE);
        let matrix_raw = read_text(&matrix_path)?;
        let distortion_raw = read_text(&distortion_path)?;
        let calib = Self::from_text(&matrix_raw, &distortion_raw)?;
        log::debug!(
            "loaded calibration from {} ({} distortion coefficients)",
            dir.display(),
            calib.distortion.len()
        );
        Ok(calib)
    }

    /// Parse the two comma-delimited text blobs.
    pub fn from_text(camera_matrix: &str, distortion: &str) -> Result<Self, CalibrationError> {
        let rows = parse_rows(CAMERA_MATRIX_FILE, camera_matrix)?;
        if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
            let got = rows
                .iter()
                .map(|r| r.len().to_string())
                .collect::<Vec<_>>()
                .join("/");
            return Err(CalibrationError::Shape {
                file: CAMERA_MATRIX_FILE.to_string(),
                expected: "3 rows of 3 values",
                got: format!("{} rows ({got} values)", rows.len()),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let camera_matrix = Matrix3::from_row_slice(&flat);

        let distortion: Vec<f64> = parse_rows(DISTORTION_FILE, distortion)?
            .into_iter()
            .flatten()
            .collect();

        Self::new(camera_matrix, distortion)
    }
}

fn read_text(path: &Path) -> Result<String, CalibrationError> {
    fs::read_to_string(path).map_err(|source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_rows(file: &str, raw: &str) -> Result<Vec<Vec<f64>>, CalibrationError> {
    let mut rows = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(',')
            .map(|token| {
                let token = token.trim();
                token.parse::<f64>().map_err(|_| CalibrationError::Parse {
                    file: file.to_string(),
                    line: idx + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}
