//! Tiny stroke font for overlay labels.
//!
//! Glyphs are line segments on a 4x6 grid (y down, row 6 is the baseline,
//! row 7 the descender). Characters without a glyph advance like a space.

use cubemark_core::PixelPoint;
use image::RgbImage;
use nalgebra::Point2;

use crate::draw::{draw_line, LineStyle};

/// Pixels per grid unit at scale `1.0`.
const GLYPH_UNIT_PX: f64 = 4.0;
const GLYPH_HEIGHT: u8 = 6;
const GLYPH_ADVANCE: u8 = 6;

type Stroke = [u8; 4];

fn glyph(c: char) -> &'static [Stroke] {
    match c {
        'X' => &[[0, 0, 4, 6], [4, 0, 0, 6]],
        'Y' => &[[0, 0, 2, 3], [4, 0, 2, 3], [2, 3, 2, 6]],
        'Z' => &[[0, 0, 4, 0], [4, 0, 0, 6], [0, 6, 4, 6]],
        '(' => &[[3, 0, 1, 2], [1, 2, 1, 4], [1, 4, 3, 6]],
        ')' => &[[1, 0, 3, 2], [3, 2, 3, 4], [3, 4, 1, 6]],
        ',' => &[[2, 5, 2, 6], [2, 6, 1, 7]],
        '-' => &[[0, 3, 4, 3]],
        '=' => &[[0, 2, 4, 2], [0, 4, 4, 4]],
        '0' => &[[0, 0, 4, 0], [4, 0, 4, 6], [4, 6, 0, 6], [0, 6, 0, 0], [0, 6, 4, 0]],
        '1' => &[[1, 1, 2, 0], [2, 0, 2, 6], [1, 6, 3, 6]],
        '2' => &[[0, 0, 4, 0], [4, 0, 4, 3], [4, 3, 0, 3], [0, 3, 0, 6], [0, 6, 4, 6]],
        '3' => &[[0, 0, 4, 0], [4, 0, 4, 6], [4, 6, 0, 6], [1, 3, 4, 3]],
        '4' => &[[0, 0, 0, 3], [0, 3, 4, 3], [4, 0, 4, 6]],
        '5' => &[[4, 0, 0, 0], [0, 0, 0, 3], [0, 3, 4, 3], [4, 3, 4, 6], [4, 6, 0, 6]],
        '6' => &[[4, 0, 0, 0], [0, 0, 0, 6], [0, 6, 4, 6], [4, 6, 4, 3], [4, 3, 0, 3]],
        '7' => &[[0, 0, 4, 0], [4, 0, 1, 6]],
        '8' => &[[0, 0, 4, 0], [4, 0, 4, 6], [4, 6, 0, 6], [0, 6, 0, 0], [0, 3, 4, 3]],
        '9' => &[[4, 3, 0, 3], [0, 3, 0, 0], [0, 0, 4, 0], [4, 0, 4, 6], [4, 6, 0, 6]],
        'i' => &[[2, 0, 2, 1], [2, 2, 2, 6]],
        'd' => &[[4, 0, 4, 6], [4, 6, 0, 6], [0, 6, 0, 3], [0, 3, 4, 3]],
        _ => &[],
    }
}

/// Draw `text` with its baseline starting at `origin` (bottom-left corner).
pub fn draw_text(
    img: &mut RgbImage,
    text: &str,
    origin: PixelPoint,
    scale: f64,
    style: &LineStyle,
) {
    let unit = GLYPH_UNIT_PX * scale;
    let top = origin.y as f64 - GLYPH_HEIGHT as f64 * unit;
    let to_px = |left: f64, gx: u8, gy: u8| -> PixelPoint {
        Point2::new(
            (left + gx as f64 * unit).round() as i32,
            (top + gy as f64 * unit).round() as i32,
        )
    };

    for (i, c) in text.chars().enumerate() {
        let left = origin.x as f64 + (i as f64) * GLYPH_ADVANCE as f64 * unit;
        for &[x0, y0, x1, y1] in glyph(c) {
            draw_line(img, to_px(left, x0, y0), to_px(left, x1, y1), style);
        }
    }
}
