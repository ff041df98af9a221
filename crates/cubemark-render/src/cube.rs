use cubemark_core::PixelPoint;
use image::{Rgb, RgbImage};

use crate::draw::{draw_line, LineStyle};

/// Index pairs of the twelve cube edges: bottom face, top face, verticals.
pub const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Default wireframe stroke: blue, 2 px.
pub const CUBE_STYLE: LineStyle = LineStyle::new(Rgb([0, 0, 255]), 2);

/// Draw a wireframe box from eight corners (bottom four, then top four).
pub fn draw_cube(img: &mut RgbImage, corners: &[PixelPoint; 8], style: &LineStyle) {
    for (a, b) in CUBE_EDGES {
        draw_line(img, corners[a], corners[b], style);
    }
}
