//! Thick line primitive shared by every overlay.

use cubemark_core::PixelPoint;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, BresenhamLineIter};
use imageproc::rect::Rect;
use nalgebra::{Point2, Vector2};

/// Colour and stroke width of a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineStyle {
    pub color: Rgb<u8>,
    /// Stroke width in pixels; `0` is drawn as `1`.
    pub width: u32,
}

impl LineStyle {
    pub const fn new(color: Rgb<u8>, width: u32) -> Self {
        Self { color, width }
    }
}

/// Liang–Barsky clip of segment `a`–`b` against an axis-aligned box.
pub fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    min: (f64, f64),
    max: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, a.0 - min.0),
        (dx, max.0 - a.0),
        (-dy, a.1 - min.1),
        (dy, max.1 - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Draw a straight segment between two pixel positions.
///
/// The segment is clipped to the image (padded by the stroke width) first,
/// so far off-screen endpoints cost nothing.
pub fn draw_line(img: &mut RgbImage, a: PixelPoint, b: PixelPoint, style: &LineStyle) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let width = style.width.max(1);
    let pad = width as f64;
    let Some((p0, p1)) = clip_segment(
        (a.x as f64, a.y as f64),
        (b.x as f64, b.y as f64),
        (-pad, -pad),
        (w as f64 - 1.0 + pad, h as f64 - 1.0 + pad),
    ) else {
        return;
    };

    let start = (p0.0.round() as f32, p0.1.round() as f32);
    let end = (p1.0.round() as f32, p1.1.round() as f32);
    let offset = (width as i32 - 1) / 2;
    for (x, y) in BresenhamLineIter::new(start, end) {
        stamp(img, x - offset, y - offset, width, style.color);
    }
}

/// Draw a closed polygon through `pts`.
pub fn draw_closed_polyline(img: &mut RgbImage, pts: &[PixelPoint], style: &LineStyle) {
    for (i, a) in pts.iter().enumerate() {
        let b = pts[(i + 1) % pts.len()];
        draw_line(img, *a, b, style);
    }
}

/// Filled square of side `side` centred on `center`.
pub fn draw_square(img: &mut RgbImage, center: PixelPoint, side: u32, color: Rgb<u8>) {
    let side = side.max(1);
    let half = (side / 2) as i32;
    let corner = offset_pixel(center, Vector2::new(-half, -half));
    stamp(img, corner.x, corner.y, side, color);
}

/// `p + d`, saturating at the `i32` range instead of overflowing.
pub fn offset_pixel(p: PixelPoint, d: Vector2<i32>) -> PixelPoint {
    Point2::new(p.x.saturating_add(d.x), p.y.saturating_add(d.y))
}

#[inline]
fn stamp(img: &mut RgbImage, x: i32, y: i32, side: u32, color: Rgb<u8>) {
    let (x0, y0) = (i64::from(x), i64::from(y));
    let side_px = i64::from(side);
    if x0 + side_px <= 0
        || y0 + side_px <= 0
        || x0 >= i64::from(img.width())
        || y0 >= i64::from(img.height())
    {
        return;
    }
    if side == 1 {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        return;
    }
    draw_filled_rect_mut(img, Rect::at(x, y).of_size(side, side), color);
}
