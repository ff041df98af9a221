use cubemark_core::{round_pixel, MarkerObservation, PixelPoint};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Vector2};

use crate::draw::{draw_closed_polyline, draw_square, offset_pixel, LineStyle};
use crate::font::draw_text;

#[derive(Clone, Debug, PartialEq)]
pub struct OutlineStyle {
    pub line: LineStyle,
    /// Marker for the first detected corner.
    pub first_corner: Rgb<u8>,
    pub first_corner_size: u32,
    pub label: LineStyle,
    pub label_scale: f64,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            line: LineStyle::new(Rgb([0, 255, 0]), 1),
            first_corner: Rgb([255, 0, 0]),
            first_corner_size: 5,
            label: LineStyle::new(Rgb([255, 0, 0]), 1),
            label_scale: 0.5,
        }
    }
}

/// Outline a detected marker and tag it with `id=N`.
pub fn draw_marker_outline(img: &mut RgbImage, marker: &MarkerObservation, style: &OutlineStyle) {
    let mut corners = [PixelPoint::origin(); 4];
    for (dst, c) in corners.iter_mut().zip(&marker.corners) {
        match round_pixel(&Point2::new(c.x as f64, c.y as f64)) {
            Some(p) => *dst = p,
            None => {
                log::debug!("marker {} has non-finite corners; outline skipped", marker.id);
                return;
            }
        }
    }

    draw_closed_polyline(img, &corners, &style.line);
    draw_square(img, corners[0], style.first_corner_size, style.first_corner);

    let label_at = offset_pixel(corners[0], Vector2::new(0, -8));
    draw_text(img, &format!("id={}", marker.id), label_at, style.label_scale, &style.label);
}
