//! Coordinate axes at a marker pose.

use cubemark_core::{
    project_points, CalibrationParameters, MarkerPose, PixelPoint, ProjectionError,
};
use image::{Rgb, RgbImage};
use nalgebra::{Point3, Vector2};

use crate::draw::{draw_line, offset_pixel, LineStyle};
use crate::font::draw_text;

/// Colours, widths and labels of the axis overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisStyle {
    /// Axis length as a multiple of the marker side.
    pub length: f64,
    pub x: LineStyle,
    pub y: LineStyle,
    pub z: LineStyle,
    pub label_scale: f64,
    /// Text drawn next to the projected origin; `None` to omit it.
    pub origin_label: Option<String>,
    pub origin_label_style: LineStyle,
    pub origin_label_offset: Vector2<i32>,
}

impl Default for AxisStyle {
    fn default() -> Self {
        Self {
            length: 2.0,
            x: LineStyle::new(Rgb([255, 0, 0]), 2),
            y: LineStyle::new(Rgb([0, 255, 0]), 2),
            z: LineStyle::new(Rgb([0, 0, 255]), 2),
            label_scale: 0.5,
            origin_label: Some("(0, 0)".to_string()),
            origin_label_style: LineStyle::new(Rgb([255, 255, 255]), 1),
            origin_label_offset: Vector2::new(10, -30),
        }
    }
}

/// Axis endpoints in marker coordinates, ordered X, origin, Y, Z.
pub fn axis_points(marker_size: f64, length: f64) -> [Point3<f64>; 4] {
    let l = length * marker_size;
    [
        Point3::new(l, 0.0, 0.0),
        Point3::origin(),
        Point3::new(0.0, l, 0.0),
        Point3::new(0.0, 0.0, l),
    ]
}

/// Draw the X/Y/Z axes of `pose` with endpoint labels.
///
/// Returns the projected `[X, O, Y, Z]` pixels. On a projection error the
/// image is left untouched.
pub fn draw_axes(
    img: &mut RgbImage,
    pose: &MarkerPose,
    marker_size: f64,
    calib: &CalibrationParameters,
    style: &AxisStyle,
) -> Result<[PixelPoint; 4], ProjectionError> {
    let px = project_points(&axis_points(marker_size, style.length), pose, calib)?;
    let [x, o, y, z] = [px[0], px[1], px[2], px[3]];

    draw_line(img, o, x, &style.x);
    draw_line(img, o, y, &style.y);
    draw_line(img, o, z, &style.z);
    draw_text(img, "X", x, style.label_scale, &style.x);
    draw_text(img, "Y", y, style.label_scale, &style.y);
    draw_text(img, "Z", z, style.label_scale, &style.z);
    if let Some(label) = &style.origin_label {
        let at = offset_pixel(o, style.origin_label_offset);
        draw_text(img, label, at, style.label_scale, &style.origin_label_style);
    }
    Ok([x, o, y, z])
}
