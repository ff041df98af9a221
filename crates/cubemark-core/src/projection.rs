//! Perspective projection of marker-local points into pixels.

use nalgebra::{Point2, Point3};

use crate::calibration::CalibrationParameters;
use crate::distortion::{distort_normalized, undistort_normalized, SUPPORTED_DISTORTION_LENGTHS};
use crate::marker::PixelPoint;
use crate::pose::MarkerPose;

/// Failures of the projection utility. All of them are frame-recoverable.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("camera matrix has a zero focal length (fx={fx}, fy={fy})")]
    DegenerateIntrinsics { fx: f64, fy: f64 },
    #[error("camera matrix is not invertible")]
    SingularCameraMatrix,
    #[error("calibration contains non-finite values")]
    NonFiniteCalibration,
    #[error("unsupported distortion vector length {len}")]
    UnsupportedDistortion { len: usize },
    #[error("point #{index} lies on the camera plane")]
    PointOnCameraPlane { index: usize },
    #[error("projection of point #{index} is not finite")]
    NonFinite { index: usize },
}

/// Project marker-local 3D points to sub-pixel image coordinates.
///
/// `X_c = R(rvec) * X + t`, then the pinhole divide, lens distortion, and the
/// intrinsic matrix. Output order matches input order.
pub fn project_points_precise(
    points: &[Point3<f64>],
    pose: &MarkerPose,
    calib: &CalibrationParameters,
) -> Result<Vec<Point2<f64>>, ProjectionError> {
    let k = calib.intrinsics()?;
    let dist = distortion_coeffs(calib)?;

    points
        .iter()
        .enumerate()
        .map(|(index, p)| {
            let pc = pose.transform_point(p);
            if pc.z == 0.0 {
                return Err(ProjectionError::PointOnCameraPlane { index });
            }
            let (xd, yd) = distort_normalized(dist, pc.x / pc.z, pc.y / pc.z);
            let (u, v) = k.to_pixel(xd, yd);
            if !u.is_finite() || !v.is_finite() {
                return Err(ProjectionError::NonFinite { index });
            }
            Ok(Point2::new(u, v))
        })
        .collect()
}

/// Project marker-local 3D points to integer pixel positions.
pub fn project_points(
    points: &[Point3<f64>],
    pose: &MarkerPose,
    calib: &CalibrationParameters,
) -> Result<Vec<PixelPoint>, ProjectionError> {
    let precise = project_points_precise(points, pose, calib)?;
    precise
        .iter()
        .enumerate()
        .map(|(index, p)| round_pixel(p).ok_or(ProjectionError::NonFinite { index }))
        .collect()
}

/// Round to the nearest pixel, ties to even.
///
/// Returns `None` when the value does not fit an `i32` pixel coordinate.
pub fn round_pixel(p: &Point2<f64>) -> Option<PixelPoint> {
    let to_i32 = |v: f64| {
        let r = v.round_ties_even();
        (r >= i32::MIN as f64 && r <= i32::MAX as f64).then_some(r as i32)
    };
    Some(Point2::new(to_i32(p.x)?, to_i32(p.y)?))
}

/// Map a distorted pixel to ideal (undistorted) normalized coordinates.
pub fn undistort_pixel(
    p: &Point2<f64>,
    calib: &CalibrationParameters,
) -> Result<Point2<f64>, ProjectionError> {
    let k = calib.intrinsics()?;
    let dist = distortion_coeffs(calib)?;
    let (xd, yd) = k.to_normalized(p.x, p.y);
    let (x, y) = undistort_normalized(dist, xd, yd);
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFinite { index: 0 });
    }
    Ok(Point2::new(x, y))
}

fn distortion_coeffs(calib: &CalibrationParameters) -> Result<&[f64], ProjectionError> {
    let len = calib.distortion.len();
    if !SUPPORTED_DISTORTION_LENGTHS.contains(&len) {
        return Err(ProjectionError::UnsupportedDistortion { len });
    }
    if calib.distortion.iter().any(|d| !d.is_finite()) {
        return Err(ProjectionError::NonFiniteCalibration);
    }
    Ok(&calib.distortion)
}
