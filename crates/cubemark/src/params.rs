use cubemark_core::MarkerId;
use cubemark_scene::RegistrationMode;
use serde::{Deserialize, Serialize};

/// Which resolved cubes end up on the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeSelection {
    /// Every marker with a layout draws its cube.
    #[default]
    AllMarkers,
    /// Only the first detected marker draws its cube; the others still
    /// publish their edges.
    FirstDetected,
}

/// Per-frame overlay behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Marker side length in world units.
    pub marker_size: f64,
    /// Frames without this marker are passed through unannotated.
    /// `None` annotates every frame with detections.
    pub target_id: Option<MarkerId>,
    pub cube_selection: CubeSelection,
    pub registration: RegistrationMode,
    pub draw_outlines: bool,
    pub draw_axes: bool,
    /// Axis length as a multiple of `marker_size`.
    pub axis_length: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            marker_size: 2.0,
            target_id: Some(0),
            cube_selection: CubeSelection::AllMarkers,
            registration: RegistrationMode::Incremental,
            draw_outlines: true,
            draw_axes: true,
            axis_length: 2.0,
        }
    }
}
