//! Core types and geometry for marker cube overlays.
//!
//! This crate is purely geometric. It knows nothing about images, windows or
//! marker decoding: it holds the camera calibration, the per-marker pose, and
//! the perspective projection that every renderer goes through.

mod calibration;
mod distortion;
mod homography;
mod logger;
mod marker;
mod pose;
mod projection;

pub use calibration::{CalibrationError, CalibrationParameters, Intrinsics};
pub use distortion::{distort_normalized, undistort_normalized, SUPPORTED_DISTORTION_LENGTHS};
pub use homography::{homography_from_4pt, Homography};
pub use marker::{MarkerId, MarkerObservation, PixelPoint};
pub use pose::{estimate_marker_pose, marker_object_points, MarkerPose, PoseError};
pub use projection::{
    project_points, project_points_precise, round_pixel, undistort_pixel, ProjectionError,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
