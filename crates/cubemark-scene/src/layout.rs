//! Static cube layouts keyed by marker identity.
//!
//! All offsets are expressed in *layout units*: half a marker side. The
//! resolver scales them by `0.5 * marker_size` before projecting.

use std::collections::BTreeMap;

use cubemark_core::MarkerId;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Identity of the large frame marker whose cube spans the four corner
/// markers of the standard board.
pub const FRAME_MARKER_ID: MarkerId = 4;

/// Physical proportions of the standard four-corner board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDims {
    /// Horizontal distance between adjacent corner markers.
    pub grid_width: f64,
    /// Vertical distance between adjacent corner markers.
    pub grid_height: f64,
    /// Cube height along the marker normal.
    pub depth: f64,
    pub frame_half_width: f64,
    pub frame_half_height: f64,
}

impl Default for BoardDims {
    fn default() -> Self {
        Self {
            grid_width: 23.5,
            grid_height: 13.0,
            depth: 3.0,
            frame_half_width: 12.75,
            frame_half_height: 7.0,
        }
    }
}

/// Eight cube corners relative to one marker, plus which neighbours may
/// supply each vertical edge.
///
/// `corners[0..4]` is the bottom face and `corners[4..8]` the top face;
/// `corners[k]` and `corners[k + 4]` form vertical edge `k`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubeLayout {
    pub corners: [Point3<f64>; 8],
    /// `neighbors[k]` is the marker whose cached edge replaces edge `k`.
    pub neighbors: [Option<MarkerId>; 4],
}

impl CubeLayout {
    /// Extrude a planar footprint (bottom face at `z = 0`) to `depth`.
    pub fn extruded(
        footprint: [[f64; 2]; 4],
        depth: f64,
        neighbors: [Option<MarkerId>; 4],
    ) -> Self {
        let mut corners = [Point3::origin(); 8];
        for (k, [x, y]) in footprint.into_iter().enumerate() {
            corners[k] = Point3::new(x, y, 0.0);
            corners[k + 4] = Point3::new(x, y, depth);
        }
        Self { corners, neighbors }
    }

    pub fn bottom(&self) -> &[Point3<f64>] {
        &self.corners[..4]
    }

    pub fn top(&self) -> &[Point3<f64>] {
        &self.corners[4..]
    }

    /// Edge index shared with `neighbor`, if any.
    pub fn edge_shared_with(&self, neighbor: MarkerId) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(neighbor))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("marker {id} lists itself as the neighbour of edge {edge}")]
    SelfNeighbor { id: MarkerId, edge: usize },
    #[error("layout for marker {id} has non-finite corner offsets")]
    NonFinite { id: MarkerId },
    #[error("anchor edge height must be positive and finite (got {0})")]
    AnchorHeight(f64),
    #[error("marker size must be positive and finite (got {0})")]
    MarkerSize(f64),
}

/// Lookup table from marker identity to its [`CubeLayout`].
///
/// Every marker also owns an *anchor edge* from its origin straight up the
/// marker normal, `anchor_height` layout units long. That edge is what a
/// marker publishes to its neighbours each frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable {
    anchor_height: f64,
    entries: BTreeMap<MarkerId, CubeLayout>,
}

impl LayoutTable {
    pub fn new(anchor_height: f64) -> Result<Self, LayoutError> {
        if !anchor_height.is_finite() || anchor_height <= 0.0 {
            return Err(LayoutError::AnchorHeight(anchor_height));
        }
        Ok(Self {
            anchor_height,
            entries: BTreeMap::new(),
        })
    }

    /// The four corner markers `0..=3` arranged cyclically, plus the frame
    /// marker `4` that borrows one edge from each of them.
    pub fn standard(dims: &BoardDims) -> Result<Self, LayoutError> {
        let (w, h, d) = (dims.grid_width, dims.grid_height, dims.depth);
        let (fw, fh) = (dims.frame_half_width, dims.frame_half_height);

        let mut table = Self::new(d)?;
        table.insert(
            0,
            CubeLayout::extruded(
                [[0.0, 0.0], [w, 0.0], [w, -h], [0.0, -h]],
                d,
                [None, Some(1), Some(2), Some(3)],
            ),
        )?;
        table.insert(
            1,
            CubeLayout::extruded(
                [[0.0, 0.0], [0.0, -h], [-w, -h], [-w, 0.0]],
                d,
                [None, Some(2), Some(3), Some(0)],
            ),
        )?;
        table.insert(
            2,
            CubeLayout::extruded(
                [[0.0, 0.0], [-w, 0.0], [-w, h], [0.0, h]],
                d,
                [None, Some(3), Some(0), Some(1)],
            ),
        )?;
        table.insert(
            3,
            CubeLayout::extruded(
                [[0.0, 0.0], [0.0, h], [w, h], [w, 0.0]],
                d,
                [None, Some(0), Some(1), Some(2)],
            ),
        )?;
        table.insert(
            FRAME_MARKER_ID,
            CubeLayout::extruded(
                [[-fw, fh], [fw, fh], [fw, -fh], [-fw, -fh]],
                d,
                [Some(0), Some(1), Some(2), Some(3)],
            ),
        )?;
        Ok(table)
    }

    /// Add or replace the layout for `id`, returning the previous one.
    pub fn insert(
        &mut self,
        id: MarkerId,
        layout: CubeLayout,
    ) -> Result<Option<CubeLayout>, LayoutError> {
        Self::check_entry(id, &layout)?;
        Ok(self.entries.insert(id, layout))
    }

    /// Re-check every entry. Needed after deserializing a table.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.anchor_height.is_finite() || self.anchor_height <= 0.0 {
            return Err(LayoutError::AnchorHeight(self.anchor_height));
        }
        self.entries
            .iter()
            .try_for_each(|(id, layout)| Self::check_entry(*id, layout))
    }

    fn check_entry(id: MarkerId, layout: &CubeLayout) -> Result<(), LayoutError> {
        if let Some(edge) = layout.edge_shared_with(id) {
            return Err(LayoutError::SelfNeighbor { id, edge });
        }
        let finite = layout
            .corners
            .iter()
            .all(|p| p.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(LayoutError::NonFinite { id });
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: MarkerId) -> Option<&CubeLayout> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: MarkerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn anchor_height(&self) -> f64 {
        self.anchor_height
    }

    /// Anchor edge endpoints `(0,0,0)` and `(0,0,anchor_height)`.
    pub fn anchor_edge(&self) -> [Point3<f64>; 2] {
        [Point3::origin(), Point3::new(0.0, 0.0, self.anchor_height)]
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &CubeLayout)> + '_ {
        self.entries.iter().map(|(id, l)| (*id, l))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
