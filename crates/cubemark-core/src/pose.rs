//! Marker pose and single-marker planar pose estimation.

use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::calibration::CalibrationParameters;
use crate::homography::homography_from_4pt;
use crate::projection::{undistort_pixel, ProjectionError};

/// Rigid transform from a marker's local frame into the camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    /// Rodrigues rotation vector (axis * angle, radians).
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl MarkerPose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn from_rotation_translation(rotation: &Rotation3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rotation.scaled_axis(),
            tvec,
        }
    }

    #[inline]
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::new(self.rvec)
    }

    /// Marker-local point expressed in camera coordinates.
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation().transform_point(p) + self.tvec
    }
}

/// Errors returned by [`estimate_marker_pose`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("marker size must be positive and finite (got {0})")]
    InvalidMarkerSize(f64),
    #[error("marker corners are degenerate")]
    DegenerateCorners,
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Marker square in its own frame, centred at the origin, in detector corner
/// order (TL, TR, BR, BL). `+x` points right, `+y` up, `+z` out of the marker.
pub fn marker_object_points(marker_size: f64) -> [Point3<f64>; 4] {
    let h = 0.5 * marker_size;
    [
        Point3::new(-h, h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(h, -h, 0.0),
        Point3::new(-h, -h, 0.0),
    ]
}

/// Estimate one marker's pose from its four image corners.
///
/// The corners are undistorted into normalized camera coordinates, a
/// plane-to-image homography is fitted, and `H ~ [r1 r2 t]` is decomposed.
/// The rotation is projected onto SO(3) and the sign is chosen so the marker
/// lies in front of the camera.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(calib)))]
pub fn estimate_marker_pose(
    corners: &[Point2<f32>; 4],
    marker_size: f64,
    calib: &CalibrationParameters,
) -> Result<MarkerPose, PoseError> {
    if !marker_size.is_finite() || marker_size <= 0.0 {
        return Err(PoseError::InvalidMarkerSize(marker_size));
    }

    let object = marker_object_points(marker_size).map(|p| Point2::new(p.x, p.y));
    let mut normalized = [Point2::origin(); 4];
    for (dst, c) in normalized.iter_mut().zip(corners) {
        *dst = undistort_pixel(&Point2::new(c.x as f64, c.y as f64), calib)?;
    }

    let h = homography_from_4pt(&object, &normalized).ok_or(PoseError::DegenerateCorners)?;
    decompose_planar_homography(&h.h).ok_or(PoseError::DegenerateCorners)
}

fn decompose_planar_homography(h: &Matrix3<f64>) -> Option<MarkerPose> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm = 0.5 * (h1.norm() + h2.norm());
    if norm < 1e-12 {
        return None;
    }
    let mut lambda = 1.0 / norm;
    if lambda * h3.z < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);
    let r = Matrix3::from_columns(&[r1, r2, r3]);

    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let tvec = h3 * lambda;
    if r_orth.iter().chain(tvec.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    let rotation = Rotation3::from_matrix_unchecked(r_orth);
    Some(MarkerPose::from_rotation_translation(&rotation, tvec))
}
