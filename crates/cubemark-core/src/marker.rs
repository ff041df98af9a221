use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Decoded marker identity (small non-negative integer).
pub type MarkerId = u32;

/// Integer pixel position, as produced by rounding a projection.
pub type PixelPoint = Point2<i32>;

/// One detected marker in one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: MarkerId,
    /// Corner pixels in detector order (TL, TR, BR, BL of the marker pattern).
    pub corners: [Point2<f32>; 4],
}

impl MarkerObservation {
    pub fn new(id: MarkerId, corners: [Point2<f32>; 4]) -> Self {
        Self { id, corners }
    }
}
