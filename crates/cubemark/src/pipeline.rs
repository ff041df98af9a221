//! Per-frame orchestration: detect, estimate, draw axes, resolve and draw
//! cubes.
//!
//! Nothing in here aborts the stream. Detector failures, missing targets,
//! failed poses, unknown layouts and degenerate projections only drop the
//! affected drawing for the current frame and are recorded in its
//! [`FrameReport`].

use cubemark_core::{CalibrationParameters, MarkerId, MarkerObservation, MarkerPose};
use cubemark_render::{
    draw_axes, draw_cube, draw_marker_outline, AxisStyle, LineStyle, OutlineStyle, CUBE_STYLE,
};
use cubemark_scene::{CornerCache, CubeResolver, ResolveError, ResolvedCube};
use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::detect::MarkerDetector;
use crate::io::Frame;
use crate::params::{CubeSelection, OverlayParams};
use crate::pose::{PlanarPoseEstimator, PoseEstimator};

/// Processing step at which a marker dropped out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Pose,
    Axes,
    Cube,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedMarker {
    pub id: MarkerId,
    pub stage: SkipStage,
    pub reason: String,
}

/// One detection with its estimated pose, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerReport {
    pub id: MarkerId,
    pub corners: [Point2<f32>; 4],
    pub pose: Option<MarkerPose>,
}

/// What happened to one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub index: u64,
    pub name: String,
    /// Whether the gating marker was seen (always true without gating).
    pub target_present: bool,
    pub markers: Vec<MarkerReport>,
    /// Cubes drawn on the frame.
    pub cubes: Vec<ResolvedCube>,
    /// Edges published by this frame's markers.
    pub cache: CornerCache,
    pub skipped: Vec<SkippedMarker>,
    #[serde(default)]
    pub detector_error: Option<String>,
}

impl FrameReport {
    fn skip(&mut self, id: MarkerId, stage: SkipStage, reason: impl ToString) {
        self.skipped.push(SkippedMarker {
            id,
            stage,
            reason: reason.to_string(),
        });
    }
}

pub struct FrameOutput {
    pub image: RgbImage,
    pub report: FrameReport,
}

/// Runs the overlay pipeline on single frames.
pub struct FrameProcessor<D, P = PlanarPoseEstimator> {
    detector: D,
    estimator: P,
    calib: CalibrationParameters,
    resolver: CubeResolver,
    params: OverlayParams,
    axis_style: AxisStyle,
    outline_style: OutlineStyle,
    cube_style: LineStyle,
}

impl<D: MarkerDetector> FrameProcessor<D> {
    pub fn new(
        detector: D,
        calib: CalibrationParameters,
        resolver: CubeResolver,
        params: OverlayParams,
    ) -> Self {
        let axis_style = AxisStyle {
            length: params.axis_length,
            ..AxisStyle::default()
        };
        Self {
            detector,
            estimator: PlanarPoseEstimator,
            calib,
            resolver,
            params,
            axis_style,
            outline_style: OutlineStyle::default(),
            cube_style: CUBE_STYLE,
        }
    }
}

impl<D: MarkerDetector, P: PoseEstimator> FrameProcessor<D, P> {
    /// Swap the pose estimator.
    pub fn with_estimator<Q: PoseEstimator>(self, estimator: Q) -> FrameProcessor<D, Q> {
        FrameProcessor {
            detector: self.detector,
            estimator,
            calib: self.calib,
            resolver: self.resolver,
            params: self.params,
            axis_style: self.axis_style,
            outline_style: self.outline_style,
            cube_style: self.cube_style,
        }
    }

    /// Annotate one frame. The input frame is not modified.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(frame = frame.index, name = %frame.name))
    )]
    pub fn process(&mut self, frame: &Frame) -> FrameOutput {
        let mut canvas = frame.image.clone();
        let mut report = FrameReport {
            index: frame.index,
            name: frame.name.clone(),
            ..FrameReport::default()
        };

        let gray = image::imageops::grayscale(&frame.image);
        let markers = match self.detector.detect(frame, &gray) {
            Ok(markers) => markers,
            Err(e) => {
                log::warn!("frame {}: {e}", frame.name);
                report.detector_error = Some(e.to_string());
                return FrameOutput {
                    image: canvas,
                    report,
                };
            }
        };

        report.target_present = match self.params.target_id {
            Some(target) => markers.iter().any(|m| m.id == target),
            None => !markers.is_empty(),
        };
        if !report.target_present {
            log::debug!(
                "frame {}: {} markers, target {:?} absent",
                frame.name,
                markers.len(),
                self.params.target_id
            );
            report.markers = markers.iter().map(|m| marker_report(m, None)).collect();
            return FrameOutput {
                image: canvas,
                report,
            };
        }

        if self.params.draw_outlines {
            for m in &markers {
                draw_marker_outline(&mut canvas, m, &self.outline_style);
            }
        }

        let posed = self.estimate_poses(&markers, &mut report);

        if self.params.draw_axes {
            for (id, pose) in &posed {
                let drawn = draw_axes(
                    &mut canvas,
                    pose,
                    self.params.marker_size,
                    &self.calib,
                    &self.axis_style,
                );
                if let Err(e) = drawn {
                    report.skip(*id, SkipStage::Axes, e);
                }
            }
        }

        let resolution = self
            .resolver
            .resolve_frame(&posed, &self.calib, self.params.registration);
        for e in &resolution.skipped {
            if matches!(e, ResolveError::UnknownMarker { .. }) {
                log::debug!("frame {}: {e}", frame.name);
            } else {
                log::warn!("frame {}: {e}", frame.name);
            }
            report.skip(e.id(), SkipStage::Cube, e);
        }

        let first = markers.first().map(|m| m.id);
        for cube in resolution.cubes {
            let wanted = match self.params.cube_selection {
                CubeSelection::AllMarkers => true,
                CubeSelection::FirstDetected => Some(cube.id) == first,
            };
            if wanted {
                draw_cube(&mut canvas, &cube.corners, &self.cube_style);
                report.cubes.push(cube);
            }
        }
        report.cache = resolution.cache;

        log::debug!(
            "frame {}: {} markers, {} cubes, {} skipped",
            frame.name,
            report.markers.len(),
            report.cubes.len(),
            report.skipped.len()
        );
        FrameOutput {
            image: canvas,
            report,
        }
    }

    fn estimate_poses(
        &self,
        markers: &[MarkerObservation],
        report: &mut FrameReport,
    ) -> Vec<(MarkerId, MarkerPose)> {
        let mut posed = Vec::with_capacity(markers.len());
        for m in markers {
            match self
                .estimator
                .estimate(m, self.params.marker_size, &self.calib)
            {
                Ok(pose) => {
                    posed.push((m.id, pose));
                    report.markers.push(marker_report(m, Some(pose)));
                }
                Err(e) => {
                    log::warn!("marker {}: pose failed: {e}", m.id);
                    report.skip(m.id, SkipStage::Pose, e);
                    report.markers.push(marker_report(m, None));
                }
            }
        }
        posed
    }
}

fn marker_report(m: &MarkerObservation, pose: Option<MarkerPose>) -> MarkerReport {
    MarkerReport {
        id: m.id,
        corners: m.corners,
        pose,
    }
}
