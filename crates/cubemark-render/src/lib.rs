//! Drawing for marker overlays: axes, wireframe cubes and marker outlines.
//!
//! Everything draws into an [`image::RgbImage`] in place and clips to the
//! image bounds. Pixel inputs come from
//! [`cubemark_core::project_points`]; the axis renderer projects on its own.

mod axes;
mod cube;
mod draw;
mod font;
mod outline;

pub use axes::{axis_points, draw_axes, AxisStyle};
pub use cube::{draw_cube, CUBE_EDGES, CUBE_STYLE};
pub use draw::{
    clip_segment, draw_closed_polyline, draw_line, draw_square, offset_pixel, LineStyle,
};
pub use font::draw_text;
pub use outline::{draw_marker_outline, OutlineStyle};
