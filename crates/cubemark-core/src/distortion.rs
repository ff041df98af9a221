//! Radial/tangential lens distortion in OpenCV coefficient order.

/// Accepted distortion vector lengths: none, `k1 k2 p1 p2`, `+k3`, `+k4 k5 k6`.
pub const SUPPORTED_DISTORTION_LENGTHS: [usize; 4] = [0, 4, 5, 8];

const UNDISTORT_ITERS: usize = 20;

#[derive(Clone, Copy, Debug, Default)]
struct Coeffs {
    k1: f64,
    k2: f64,
    p1: f64,
    p2: f64,
    k3: f64,
    k4: f64,
    k5: f64,
    k6: f64,
}

impl Coeffs {
    fn from_slice(d: &[f64]) -> Self {
        let at = |i: usize| d.get(i).copied().unwrap_or(0.0);
        Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
            k4: at(5),
            k5: at(6),
            k6: at(7),
        }
    }

    /// `(numerator, denominator)` of the rational radial factor.
    #[inline]
    fn radial(&self, r2: f64) -> (f64, f64) {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        (
            1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6,
            1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6,
        )
    }

    #[inline]
    fn tangential(&self, x: f64, y: f64, r2: f64) -> (f64, f64) {
        (
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }
}

/// Apply lens distortion to ideal normalized coordinates.
///
/// Missing trailing coefficients are treated as zero.
pub fn distort_normalized(coeffs: &[f64], x: f64, y: f64) -> (f64, f64) {
    if coeffs.is_empty() {
        return (x, y);
    }
    let c = Coeffs::from_slice(coeffs);
    let r2 = x * x + y * y;
    let (num, den) = c.radial(r2);
    let radial = num / den;
    let (dx, dy) = c.tangential(x, y, r2);
    (x * radial + dx, y * radial + dy)
}

/// Invert [`distort_normalized`] by fixed-point iteration.
pub fn undistort_normalized(coeffs: &[f64], xd: f64, yd: f64) -> (f64, f64) {
    if coeffs.is_empty() {
        return (xd, yd);
    }
    let c = Coeffs::from_slice(coeffs);
    let (mut x, mut y) = (xd, yd);
    for _ in 0..UNDISTORT_ITERS {
        let r2 = x * x + y * y;
        let (num, den) = c.radial(r2);
        let inv_radial = den / num;
        let (dx, dy) = c.tangential(x, y, r2);
        x = (xd - dx) * inv_radial;
        y = (yd - dy) * inv_radial;
    }
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_coefficients_are_identity() {
        assert_eq!(distort_normalized(&[], 0.3, -0.2), (0.3, -0.2));
        assert_eq!(undistort_normalized(&[], 0.3, -0.2), (0.3, -0.2));
    }

    #[test]
    fn matches_closed_form_five_term_model() {
        let d = [0.1, -0.02, 0.001, -0.002, 0.005];
        let (x, y) = (0.2, -0.1);
        let r2: f64 = x * x + y * y;
        let radial = 1.0 + 0.1 * r2 - 0.02 * r2 * r2 + 0.005 * r2 * r2 * r2;
        let ex = x * radial + 2.0 * 0.001 * x * y + (-0.002) * (r2 + 2.0 * x * x);
        let ey = y * radial + 0.001 * (r2 + 2.0 * y * y) + 2.0 * (-0.002) * x * y;
        let (dx, dy) = distort_normalized(&d, x, y);
        assert_abs_diff_eq!(dx, ex, epsilon = 1e-15);
        assert_abs_diff_eq!(dy, ey, epsilon = 1e-15);
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = [-0.25, 0.08, 0.0005, -0.0007, 0.0, 0.01, 0.0, 0.0];
        for &(x, y) in &[(0.0, 0.0), (0.15, 0.1), (-0.3, 0.2), (0.25, -0.25)] {
            let (xd, yd) = distort_normalized(&d, x, y);
            let (ux, uy) = undistort_normalized(&d, xd, yd);
            assert_abs_diff_eq!(ux, x, epsilon = 1e-7);
            assert_abs_diff_eq!(uy, y, epsilon = 1e-7);
        }
    }
}
