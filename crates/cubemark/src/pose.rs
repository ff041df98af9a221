use cubemark_core::{
    estimate_marker_pose, CalibrationParameters, MarkerObservation, MarkerPose, PoseError,
};

/// Turns one marker's image corners into a camera-frame pose.
pub trait PoseEstimator {
    fn estimate(
        &self,
        marker: &MarkerObservation,
        marker_size: f64,
        calib: &CalibrationParameters,
    ) -> Result<MarkerPose, PoseError>;
}

/// Single-marker planar pose from the corner homography.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarPoseEstimator;

impl PoseEstimator for PlanarPoseEstimator {
    fn estimate(
        &self,
        marker: &MarkerObservation,
        marker_size: f64,
        calib: &CalibrationParameters,
    ) -> Result<MarkerPose, PoseError> {
        estimate_marker_pose(&marker.corners, marker_size, calib)
    }
}
