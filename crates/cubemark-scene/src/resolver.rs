//! Cube-corner resolution with cross-marker edge sharing.
//!
//! Each marker publishes its anchor edge into the frame's [`CornerCache`],
//! projected from its own pose only. When a marker's cube is resolved, every
//! vertical edge whose designated neighbour has already published is taken
//! from the cache verbatim; the rest are projected from the marker's pose.
//! Resolution order therefore matters: a marker sees the edges of markers
//! registered before it, never after.

use cubemark_core::{
    project_points, CalibrationParameters, MarkerId, MarkerPose, PixelPoint, ProjectionError,
};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::cache::{CornerCache, CornerPair};
use crate::layout::{LayoutError, LayoutTable};

/// Where a vertical edge of a resolved cube came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerSource {
    /// Projected from the cube owner's own pose.
    Projected,
    /// Copied from the anchor edge published by this marker.
    Shared(MarkerId),
}

/// Eight pixel corners of one marker's cube.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCube {
    pub id: MarkerId,
    /// Bottom face then top face.
    pub corners: [PixelPoint; 8],
    /// Origin of vertical edge `k` (`corners[k]`, `corners[k + 4]`).
    pub sources: [CornerSource; 4],
}

impl ResolvedCube {
    pub fn edge(&self, k: usize) -> CornerPair {
        CornerPair {
            bottom: self.corners[k],
            top: self.corners[k + 4],
        }
    }

    pub fn shared_edges(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s, CornerSource::Shared(_)))
            .count()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("no cube layout for marker {id}")]
    UnknownMarker { id: MarkerId },
    #[error("projection failed for marker {id}: {source}")]
    Projection {
        id: MarkerId,
        #[source]
        source: ProjectionError,
    },
}

impl ResolveError {
    pub fn id(&self) -> MarkerId {
        match self {
            Self::UnknownMarker { id } | Self::Projection { id, .. } => *id,
        }
    }
}

/// When markers publish their anchor edges relative to resolving cubes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Register then resolve, one marker at a time, in detection order.
    #[default]
    Incremental,
    /// Register every marker first, then resolve all cubes.
    UpFront,
}

/// Everything produced by resolving one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResolution {
    pub cubes: Vec<ResolvedCube>,
    pub skipped: Vec<ResolveError>,
    pub cache: CornerCache,
}

impl FrameResolution {
    pub fn cube(&self, id: MarkerId) -> Option<&ResolvedCube> {
        self.cubes.iter().find(|c| c.id == id)
    }
}

/// Resolves cube corners for markers of a given physical size.
#[derive(Clone, Debug)]
pub struct CubeResolver {
    layouts: LayoutTable,
    marker_size: f64,
}

impl CubeResolver {
    pub fn new(layouts: LayoutTable, marker_size: f64) -> Result<Self, LayoutError> {
        if !marker_size.is_finite() || marker_size <= 0.0 {
            return Err(LayoutError::MarkerSize(marker_size));
        }
        layouts.validate()?;
        Ok(Self {
            layouts,
            marker_size,
        })
    }

    pub fn layouts(&self) -> &LayoutTable {
        &self.layouts
    }

    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    /// Metric length of one layout unit.
    #[inline]
    pub fn unit(&self) -> f64 {
        0.5 * self.marker_size
    }

    fn scaled(&self, pts: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let unit = self.unit();
        pts.iter().map(|p| Point3::from(p.coords * unit)).collect()
    }

    /// Project `id`'s anchor edge from its own pose and publish it.
    pub fn register_self(
        &self,
        id: MarkerId,
        pose: &MarkerPose,
        calib: &CalibrationParameters,
        cache: &mut CornerCache,
    ) -> Result<CornerPair, ResolveError> {
        if !self.layouts.contains(id) {
            return Err(ResolveError::UnknownMarker { id });
        }
        let edge = self.scaled(&self.layouts.anchor_edge());
        let px = project_points(&edge, pose, calib)
            .map_err(|source| ResolveError::Projection { id, source })?;
        let pair = CornerPair {
            bottom: px[0],
            top: px[1],
        };
        if let Some(prev) = cache.insert(id, pair) {
            log::debug!("marker {id} registered twice; replacing edge {prev:?}");
        }
        Ok(pair)
    }

    /// Resolve `id`'s eight cube corners against `cache`.
    ///
    /// The cache is only read, so repeated calls with the same inputs give
    /// the same cube.
    pub fn resolve(
        &self,
        id: MarkerId,
        pose: &MarkerPose,
        calib: &CalibrationParameters,
        cache: &CornerCache,
    ) -> Result<ResolvedCube, ResolveError> {
        let layout = self
            .layouts
            .get(id)
            .ok_or(ResolveError::UnknownMarker { id })?;

        let projected = project_points(&self.scaled(&layout.corners), pose, calib)
            .map_err(|source| ResolveError::Projection { id, source })?;
        let mut corners = [PixelPoint::origin(); 8];
        corners.copy_from_slice(&projected);

        let mut sources = [CornerSource::Projected; 4];
        for (k, neighbor) in layout.neighbors.iter().enumerate() {
            let Some(n) = *neighbor else { continue };
            if let Some(pair) = cache.get(n) {
                corners[k] = pair.bottom;
                corners[k + 4] = pair.top;
                sources[k] = CornerSource::Shared(n);
            }
        }

        Ok(ResolvedCube {
            id,
            corners,
            sources,
        })
    }

    /// Resolve every marker of one frame, in the given (detection) order.
    ///
    /// Unknown identities and projection failures skip that marker only.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(markers = markers.len(), mode = ?mode))
    )]
    pub fn resolve_frame(
        &self,
        markers: &[(MarkerId, MarkerPose)],
        calib: &CalibrationParameters,
        mode: RegistrationMode,
    ) -> FrameResolution {
        let mut out = FrameResolution::default();

        match mode {
            RegistrationMode::Incremental => {
                for (id, pose) in markers {
                    let step = self
                        .register_self(*id, pose, calib, &mut out.cache)
                        .and_then(|_| self.resolve(*id, pose, calib, &out.cache));
                    match step {
                        Ok(cube) => out.cubes.push(cube),
                        Err(e) => out.skipped.push(e),
                    }
                }
            }
            RegistrationMode::UpFront => {
                let mut registered = Vec::with_capacity(markers.len());
                for (id, pose) in markers {
                    match self.register_self(*id, pose, calib, &mut out.cache) {
                        Ok(_) => registered.push((*id, pose)),
                        Err(e) => out.skipped.push(e),
                    }
                }
                for (id, pose) in registered {
                    match self.resolve(id, pose, calib, &out.cache) {
                        Ok(cube) => out.cubes.push(cube),
                        Err(e) => out.skipped.push(e),
                    }
                }
            }
        }

        for e in &out.skipped {
            log::debug!("skipping cube: {e}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoardDims;
    use nalgebra::{Point2, Vector3};

    fn resolver() -> CubeResolver {
        let table = LayoutTable::standard(&BoardDims::default()).expect("table");
        CubeResolver::new(table, 2.0).expect("resolver")
    }

    fn camera() -> CalibrationParameters {
        CalibrationParameters::pinhole(80.0, 80.0, 320.0, 240.0)
    }

    fn at(x: f64, y: f64, z: f64) -> MarkerPose {
        MarkerPose::new(Vector3::zeros(), Vector3::new(x, y, z))
    }

    #[test]
    fn golden_cube_for_marker_zero() {
        let cube = resolver()
            .resolve(0, &at(0.0, 0.0, 20.0), &camera(), &CornerCache::new())
            .expect("cube");
        let expect = [
            (320, 240),
            (414, 240),
            (414, 188),
            (320, 188),
            (320, 240),
            (402, 240),
            (402, 195),
            (320, 195),
        ]
        .map(|(x, y)| Point2::new(x, y));
        assert_eq!(cube.corners, expect);
        assert_eq!(cube.sources, [CornerSource::Projected; 4]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let r = resolver();
        let pose = MarkerPose::new(Vector3::new(0.1, -0.2, 0.05), Vector3::new(2.0, 1.0, 40.0));
        let cache = CornerCache::new();
        let first = r.resolve(2, &pose, &camera(), &cache).expect("cube");
        let second = r.resolve(2, &pose, &camera(), &cache).expect("cube");
        assert_eq!(first, second);
        assert!(cache.is_empty());
    }

    #[test]
    fn register_self_uses_own_pose_only() {
        let r = resolver();
        let mut cache = CornerCache::new();
        let pair = r
            .register_self(1, &at(0.0, 0.0, 20.0), &camera(), &mut cache)
            .expect("register");
        // anchor edge (0,0,0)-(0,0,3): both ends project onto the principal point
        assert_eq!(pair.bottom, Point2::new(320, 240));
        assert_eq!(pair.top, Point2::new(320, 240));
        assert_eq!(cache.get(1), Some(&pair));
    }

    #[test]
    fn neighbour_edge_is_reused_verbatim() {
        let r = resolver();
        let calib = camera();
        let a = at(-4.0, 1.0, 25.0);
        let b = MarkerPose::new(Vector3::new(0.0, 0.05, 0.0), Vector3::new(3.0, -2.0, 22.0));

        let frame = r.resolve_frame(&[(0, a), (1, b)], &calib, RegistrationMode::Incremental);
        let pair_a = *frame.cache.get(0).expect("marker 0 registered");

        let mut only_a = CornerCache::new();
        let direct = r.register_self(0, &a, &calib, &mut only_a).expect("register");
        assert_eq!(pair_a, direct);

        let cube_b = frame.cube(1).expect("cube for marker 1");
        let k = r.layouts().get(1).and_then(|l| l.edge_shared_with(0)).expect("adjacent");
        assert_eq!(k, 3);
        assert_eq!(cube_b.edge(k), pair_a);
        assert_eq!(cube_b.sources[k], CornerSource::Shared(0));

        let own = r.resolve(1, &b, &calib, &CornerCache::new()).expect("cube");
        assert_ne!(own.edge(k), pair_a);
    }

    #[test]
    fn resolution_order_changes_shared_edges() {
        let r = resolver();
        let calib = camera();
        let a = at(0.0, 0.0, 20.0);
        let b = at(5.0, 0.0, 20.0);

        let ab = r.resolve_frame(&[(0, a), (1, b)], &calib, RegistrationMode::Incremental);
        let ba = r.resolve_frame(&[(1, b), (0, a)], &calib, RegistrationMode::Incremental);

        let cube0_ab = ab.cube(0).expect("cube 0");
        let cube0_ba = ba.cube(0).expect("cube 0");
        assert_eq!(cube0_ab.sources[1], CornerSource::Projected);
        assert_eq!(cube0_ba.sources[1], CornerSource::Shared(1));

        // marker 1 edge 3 (footprint (-w, 0)) only borrows marker 0's edge when 0 came first
        assert_eq!(ab.cube(1).expect("cube 1").edge(3).bottom, Point2::new(320, 240));
        assert_eq!(ba.cube(1).expect("cube 1").edge(3).bottom, Point2::new(246, 240));
    }

    #[test]
    fn up_front_registration_shares_both_ways() {
        let r = resolver();
        let calib = camera();
        let a = at(0.0, 0.0, 20.0);
        let b = at(5.0, 0.0, 20.0);

        let frame = r.resolve_frame(&[(1, b), (0, a)], &calib, RegistrationMode::UpFront);
        assert_eq!(frame.cube(0).expect("cube 0").sources[1], CornerSource::Shared(1));
        assert_eq!(frame.cube(1).expect("cube 1").sources[3], CornerSource::Shared(0));
        assert_eq!(frame.cubes.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn frame_marker_borrows_from_all_corners() {
        let r = resolver();
        let calib = camera();
        let markers: Vec<_> = (0..4u32)
            .map(|id| (id, at(id as f64 - 1.5, 0.5, 30.0)))
            .chain(std::iter::once((4, at(0.0, 0.0, 30.0))))
            .collect();
        let frame = r.resolve_frame(&markers, &calib, RegistrationMode::Incremental);
        let frame_cube = frame.cube(4).expect("frame cube");
        assert_eq!(frame_cube.shared_edges(), 4);
        for id in 0..4u32 {
            assert_eq!(frame_cube.edge(id as usize), *frame.cache.get(id).expect("registered"));
        }
    }

    #[test]
    fn unknown_marker_is_skipped_without_registration() {
        let r = resolver();
        let frame = r.resolve_frame(
            &[(7, at(0.0, 0.0, 20.0)), (0, at(1.0, 0.0, 20.0))],
            &camera(),
            RegistrationMode::Incremental,
        );
        assert_eq!(frame.skipped, vec![ResolveError::UnknownMarker { id: 7 }]);
        assert_eq!(frame.cubes.len(), 1);
        assert!(!frame.cache.contains(7));
        assert!(matches!(
            r.resolve(7, &at(0.0, 0.0, 20.0), &camera(), &frame.cache),
            Err(ResolveError::UnknownMarker { id: 7 })
        ));
    }

    #[test]
    fn degenerate_pose_skips_only_that_marker() {
        let r = resolver();
        let frame = r.resolve_frame(
            &[(0, at(0.0, 0.0, 0.0)), (1, at(0.0, 0.0, 20.0))],
            &camera(),
            RegistrationMode::Incremental,
        );
        assert_eq!(frame.skipped.len(), 1);
        assert_eq!(frame.skipped[0].id(), 0);
        assert!(matches!(frame.skipped[0], ResolveError::Projection { .. }));
        assert_eq!(frame.cubes[0].id, 1);
    }

    #[test]
    fn marker_size_scales_offsets() {
        let table = LayoutTable::standard(&BoardDims::default()).expect("table");
        let r = CubeResolver::new(table, 4.0).expect("resolver");
        let cube = r
            .resolve(0, &at(0.0, 0.0, 40.0), &camera(), &CornerCache::new())
            .expect("cube");
        // doubling both size and distance leaves the image unchanged
        assert_eq!(cube.corners[1], Point2::new(414, 240));
        assert!(matches!(
            CubeResolver::new(r.layouts().clone(), -1.0),
            Err(LayoutError::MarkerSize(_))
        ));
    }
}
