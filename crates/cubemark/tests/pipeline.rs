//! Frame pipeline and run loop on synthetic frames with detections produced
//! by projecting known marker poses.

use std::collections::VecDeque;
use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use cubemark::core::{marker_object_points, project_points_precise};
use cubemark::core::PoseError;
use cubemark::scene::CornerSource;
use cubemark::{
    run, BoardDims, CalibrationParameters, CubeResolver, CubeSelection, DetectError, Frame,
    FrameProcessor, FrameSink, FrameSource, LayoutTable, LoopControl, MarkerId,
    MarkerObservation, MarkerPose, OverlayParams, PoseEstimator, RegistrationMode, RunOptions,
    SinkError, SkipStage, SourceError,
};
use image::{GrayImage, Rgb, RgbImage};
use nalgebra::{Point2, Rotation3, Vector3};

const MARKER_SIZE: f64 = 2.0;
const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

type Detector = Box<dyn FnMut(&Frame, &GrayImage) -> Result<Vec<MarkerObservation>, DetectError>>;

fn calib() -> CalibrationParameters {
    CalibrationParameters::pinhole(600.0, 600.0, 320.0, 240.0)
}

fn frame(index: u64) -> Frame {
    Frame::new(
        index,
        format!("frame_{index:03}"),
        RgbImage::from_pixel(640, 480, BACKGROUND),
    )
}

/// Marker `id` on a board facing the camera, placed at its grid position.
fn board_pose(id: MarkerId) -> MarkerPose {
    let dims = BoardDims::default();
    let unit = 0.5 * MARKER_SIZE;
    let rotation = Rotation3::from_euler_angles(PI + 0.2, 0.1, 0.0);
    let (x, y) = match id {
        0 => (0.0, 0.0),
        1 => (dims.grid_width, 0.0),
        2 => (dims.grid_width, -dims.grid_height),
        3 => (0.0, -dims.grid_height),
        _ => (0.5 * dims.grid_width, -0.5 * dims.grid_height),
    };
    let t = Vector3::new(-10.0, -5.0, 45.0) + rotation * Vector3::new(x * unit, y * unit, 0.0);
    MarkerPose::from_rotation_translation(&rotation, t)
}

fn observe(id: MarkerId) -> MarkerObservation {
    let px = project_points_precise(&marker_object_points(MARKER_SIZE), &board_pose(id), &calib())
        .expect("project");
    MarkerObservation::new(id, [0, 1, 2, 3].map(|i| Point2::new(px[i].x as f32, px[i].y as f32)))
}

fn fixed(ids: &[MarkerId]) -> Detector {
    let markers: Vec<_> = ids.iter().map(|&id| observe(id)).collect();
    Box::new(move |_: &Frame, _: &GrayImage| Ok(markers.clone()))
}

fn processor(detector: Detector, params: OverlayParams) -> FrameProcessor<Detector> {
    let table = LayoutTable::standard(&BoardDims::default()).expect("table");
    let resolver = CubeResolver::new(table, params.marker_size).expect("resolver");
    FrameProcessor::new(detector, calib(), resolver, params)
}

fn count_color(img: &RgbImage, color: Rgb<u8>) -> usize {
    img.pixels().filter(|p| **p == color).count()
}

#[test]
fn frame_without_target_is_passed_through() {
    let mut p = processor(fixed(&[1, 2]), OverlayParams::default());
    let input = frame(0);
    let out = p.process(&input);

    assert_eq!(out.image, input.image);
    assert!(!out.report.target_present);
    assert_eq!(out.report.markers.len(), 2);
    assert!(out.report.cubes.is_empty());
    assert!(out.report.cache.is_empty());
}

#[test]
fn adjacent_markers_share_their_common_edge() {
    let mut p = processor(fixed(&[0, 1]), OverlayParams::default());
    let out = p.process(&frame(0));
    let report = &out.report;

    assert!(report.target_present);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.cubes.len(), 2);
    for m in &report.markers {
        let pose = m.pose.expect("pose");
        assert_abs_diff_eq!(pose.tvec, board_pose(m.id).tvec, epsilon = 1e-2);
    }

    let cube1 = report.cubes.iter().find(|c| c.id == 1).expect("cube 1");
    assert_eq!(cube1.sources[3], CornerSource::Shared(0));
    assert_eq!(cube1.edge(3), *report.cache.get(0).expect("edge 0"));

    // marker 0 resolved before marker 1 published anything
    let cube0 = report.cubes.iter().find(|c| c.id == 0).expect("cube 0");
    assert!(cube0.sources.iter().all(|s| *s == CornerSource::Projected));

    assert!(count_color(&out.image, Rgb([0, 0, 255])) > 0);
    assert!(count_color(&out.image, Rgb([255, 0, 0])) > 0);
}

#[test]
fn first_detected_selection_draws_one_cube_but_caches_all() {
    let params = OverlayParams {
        cube_selection: CubeSelection::FirstDetected,
        ..OverlayParams::default()
    };
    let mut p = processor(fixed(&[1, 0]), params);
    let report = p.process(&frame(0)).report;

    assert_eq!(report.cubes.len(), 1);
    assert_eq!(report.cubes[0].id, 1);
    assert!(report.cache.contains(0));
    assert!(report.cache.contains(1));
}

#[test]
fn marker_without_layout_gets_axes_while_known_markers_get_cubes() {
    let params = OverlayParams {
        draw_outlines: false,
        ..OverlayParams::default()
    };
    let mut both = processor(fixed(&[9, 0]), params.clone());
    let out = both.process(&frame(0));

    assert_eq!(out.report.cubes.len(), 1);
    assert_eq!(out.report.cubes[0].id, 0);
    assert_eq!(out.report.skipped.len(), 1);
    assert_eq!(out.report.skipped[0].id, 9);
    assert_eq!(out.report.skipped[0].stage, SkipStage::Cube);
    assert!(out.report.markers.iter().all(|m| m.pose.is_some()));
    assert!(!out.report.cache.contains(9));
    assert!(count_color(&out.image, Rgb([0, 0, 255])) > 0);

    // the unknown marker still contributes its axes
    let mut known_only = processor(fixed(&[0]), params);
    let without = known_only.process(&frame(0));
    assert_eq!(without.report.cubes, out.report.cubes);
    assert_ne!(without.image, out.image);
}

#[test]
fn no_gating_needs_at_least_one_marker() {
    let params = OverlayParams {
        target_id: None,
        ..OverlayParams::default()
    };
    let mut p = processor(fixed(&[]), params);
    let input = frame(0);
    let out = p.process(&input);
    assert!(!out.report.target_present);
    assert_eq!(out.image, input.image);
}

#[test]
fn detector_failure_passes_frame_through() {
    let failing: Detector =
        Box::new(|_: &Frame, _: &GrayImage| Err(DetectError::Backend("camera glitch".into())));
    let mut p = processor(failing, OverlayParams::default());
    let input = frame(3);
    let out = p.process(&input);

    assert_eq!(out.image, input.image);
    assert_eq!(out.report.index, 3);
    assert!(out
        .report
        .detector_error
        .as_deref()
        .is_some_and(|e| e.contains("camera glitch")));
}

#[test]
fn degenerate_corners_skip_pose_only_for_that_marker() {
    let mut bad = observe(1);
    bad.corners = [Point2::new(100.0, 100.0); 4];
    let mut markers = vec![observe(0), bad];
    let detector: Detector =
        Box::new(move |_: &Frame, _: &GrayImage| Ok(std::mem::take(&mut markers)));
    let mut p = processor(detector, OverlayParams::default());
    let report = p.process(&frame(0)).report;

    assert_eq!(report.cubes.len(), 1);
    assert_eq!(report.cubes[0].id, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].stage, SkipStage::Pose);
    assert!(report.markers[1].pose.is_none());
}

/// Returns the ground-truth board pose regardless of the corners.
struct BoardPoses;

impl PoseEstimator for BoardPoses {
    fn estimate(
        &self,
        marker: &MarkerObservation,
        _marker_size: f64,
        _calib: &CalibrationParameters,
    ) -> Result<MarkerPose, PoseError> {
        Ok(board_pose(marker.id))
    }
}

#[test]
fn swapped_estimator_drives_the_cubes() {
    // collapsed corners would defeat the planar estimator
    let collapsed: Vec<_> = [0, 1]
        .map(|id| MarkerObservation::new(id, [Point2::new(50.0, 50.0); 4]))
        .to_vec();
    let detector: Detector = Box::new(move |_: &Frame, _: &GrayImage| Ok(collapsed.clone()));
    let mut p = processor(detector, OverlayParams::default()).with_estimator(BoardPoses);
    let report = p.process(&frame(0)).report;
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);

    let table = LayoutTable::standard(&BoardDims::default()).expect("table");
    let resolver = CubeResolver::new(table, MARKER_SIZE).expect("resolver");
    let expected = resolver.resolve_frame(
        &[(0, board_pose(0)), (1, board_pose(1))],
        &calib(),
        RegistrationMode::Incremental,
    );
    assert_eq!(report.cubes, expected.cubes);
    assert_eq!(report.cache, expected.cache);
    assert_eq!(report.markers[1].pose, Some(board_pose(1)));
}

struct VecSource(VecDeque<Frame>);

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.0.pop_front())
    }
}

/// Collects frame names and asks to stop after `stop_after` frames.
struct StopAfter {
    stop_after: usize,
    seen: Vec<String>,
}

impl FrameSink for StopAfter {
    fn present(&mut self, frame: &Frame, _annotated: &RgbImage) -> Result<LoopControl, SinkError> {
        self.seen.push(frame.name.clone());
        Ok(if self.seen.len() >= self.stop_after {
            LoopControl::Stop
        } else {
            LoopControl::Continue
        })
    }
}

fn source(n: u64) -> VecSource {
    VecSource((0..n).map(frame).collect())
}

#[test]
fn run_stops_when_sink_asks() {
    let mut p = processor(fixed(&[0, 1]), OverlayParams::default());
    let mut sink = StopAfter {
        stop_after: 2,
        seen: Vec::new(),
    };
    let report = run(&mut source(5), &mut sink, &mut p, &RunOptions::default()).expect("run");

    assert!(report.stopped_by_sink);
    assert_eq!(report.frames_processed, 2);
    assert_eq!(sink.seen, ["frame_000", "frame_001"]);
    assert_eq!(report.frames_with_cubes(), 2);
}

#[test]
fn run_honours_max_frames_and_source_end() {
    let mut p = processor(fixed(&[2]), OverlayParams::default());
    let mut sink = StopAfter {
        stop_after: usize::MAX,
        seen: Vec::new(),
    };

    let capped = RunOptions {
        max_frames: Some(3),
    };
    let report = run(&mut source(5), &mut sink, &mut p, &capped).expect("run");
    assert_eq!(report.frames_processed, 3);
    assert!(!report.stopped_by_sink);

    let report = run(&mut source(2), &mut sink, &mut p, &RunOptions::default()).expect("run");
    assert_eq!(report.frames_processed, 2);
    assert_eq!(report.frames_with_cubes(), 0);
    assert!(report.frames.iter().all(|f| !f.target_present));
}
