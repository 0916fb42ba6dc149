// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

use nalgebra::{Point3, Vector3};

/// Calculate the (unnormalized) normal of a triangle given three vertices
pub fn triangle_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    (p1 - p0).cross(&(p2 - p0))
}

/// Area of the triangle spanned by three points
pub fn triangle_area(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    triangle_normal(p0, p1, p2).norm() * 0.5
}

/// Check if two floats are approximately equal
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Linear interpolation between two points
pub fn lerp(a: &Point3<f64>, b: &Point3<f64>, t: f64) -> Point3<f64> {
    a + (b - a) * t
}

/// Signed solid angle subtended by triangle `(a, b, c)` as seen from `p`.
///
/// Van Oosterom and Strackee's formula. Positive when the triangle winds
/// counter-clockwise around `p`'s line of sight.
pub fn solid_angle(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ra = a - p;
    let rb = b - p;
    let rc = c - p;
    let la = ra.norm();
    let lb = rb.norm();
    let lc = rc.norm();

    let numerator = ra.dot(&rb.cross(&rc));
    let denominator =
        la * lb * lc + ra.dot(&rb) * lc + rb.dot(&rc) * la + rc.dot(&ra) * lb;
    2.0 * numerator.atan2(denominator)
}

/// Projection of `p` onto segment `a..b`.
///
/// Returns the segment parameter (unclamped) and the distance from `p` to the
/// projected point on the infinite line.
pub fn project_onto_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> (f64, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (0.0, (p - a).norm());
    }
    let t = (p - a).dot(&ab) / len_sq;
    let closest = a + ab * t;
    (t, (p - closest).norm())
}

/// Interior angle at `corner` between the rays towards `a` and `b`, in radians
pub fn corner_angle(corner: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let u = a - corner;
    let v = b - corner;
    let denom = u.norm() * v.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (u.dot(&v) / denom).clamp(-1.0, 1.0).acos()
}

/// Smallest interior angle of a triangle
pub fn min_triangle_angle(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    corner_angle(p0, p1, p2)
        .min(corner_angle(p1, p2, p0))
        .min(corner_angle(p2, p0, p1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0001, 0.001));
        assert!(!approx_eq(1.0, 1.1, 0.001));
    }

    #[test]
    fn test_lerp() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 0.0, -2.0);
        assert_eq!(lerp(&a, &b, 0.5), Point3::new(5.0, 0.0, -1.0));
        assert_eq!(lerp(&a, &b, 0.0), a);
        assert_eq!(lerp(&a, &b, 1.0), b);
    }

    #[test]
    fn test_triangle_area() {
        let area = triangle_area(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
            &Point3::new(0.0, 2.0, 0.0),
        );
        assert_relative_eq!(area, 2.0);
    }

    #[test]
    fn test_solid_angle_of_octant() {
        // The triangle through the three unit axis points covers one eighth of the sphere.
        let omega = solid_angle(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert_relative_eq!(omega, 4.0 * PI / 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_onto_segment() {
        let (t, d) = project_onto_segment(
            &Point3::new(1.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(4.0, 0.0, 0.0),
        );
        assert_relative_eq!(t, 0.25);
        assert_relative_eq!(d, 1.0);
    }

    #[test]
    fn test_min_triangle_angle() {
        let angle = min_triangle_angle(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(angle, PI / 4.0, epsilon = 1e-12);
    }
}
