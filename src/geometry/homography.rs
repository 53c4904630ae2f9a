//! Four-point planar homography via direct linear transform.
//!
//! The content warp only ever needs the exact four-correspondence case, so a
//! full RANSAC estimator would be overkill. The solve runs in `f64` and the
//! result is demoted to `f32` for the rendering side; pixel coordinates
//! squared through `A^T A` would exhaust single precision.

use nalgebra::{Matrix3, Point2, SMatrix, Vector3};

const EPS: f64 = 1e-12;

/// Homography mapping the four `src` points onto the four `dst` points,
/// index for index. Correspondence order is part of the contract; callers
/// must pass both quads in the same winding.
///
/// Returns `None` when the correspondences are degenerate (collinear or
/// repeated points).
pub fn four_point_homography(
    src: &[Point2<f32>; 4],
    dst: &[Point2<f32>; 4],
) -> Option<Matrix3<f32>> {
    let mut a = SMatrix::<f64, 8, 9>::zeros();
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y) = (s.x as f64, s.y as f64);
        let (u, v) = (d.x as f64, d.y as f64);
        let r = 2 * i;
        a[(r, 0)] = -x;
        a[(r, 1)] = -y;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = u * x;
        a[(r, 7)] = u * y;
        a[(r, 8)] = u;
        a[(r + 1, 3)] = -x;
        a[(r + 1, 4)] = -y;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = v * x;
        a[(r + 1, 7)] = v * y;
        a[(r + 1, 8)] = v;
    }

    // h is the null vector of A: eigenvector of A^T A with smallest eigenvalue.
    let ata = a.transpose() * a;
    let eigen = ata.symmetric_eigen();
    let mut min_idx = 0;
    for i in 1..9 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
            min_idx = i;
        }
    }
    let h = eigen.eigenvectors.column(min_idx);

    let mut m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    // Fix the projective scale so downstream consumers see h22 = 1.
    let w = m[(2, 2)];
    if w.abs() > EPS {
        m /= w;
    }
    if m.determinant().abs() < EPS {
        return None;
    }
    Some(m.map(|v| v as f32))
}

/// Apply a homography to a point; `None` when the point maps to infinity.
pub fn apply_homography(h: &Matrix3<f32>, p: &Point2<f32>) -> Option<Point2<f32>> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    let w = v.z;
    if !w.is_finite() || w.abs() < 1e-9 {
        return None;
    }
    Some(Point2::new(v.x / w, v.y / w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_quad() -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(854.0, 0.0),
            Point2::new(854.0, 480.0),
            Point2::new(0.0, 480.0),
        ]
    }

    #[test]
    fn identical_corners_give_identity() {
        let quad = unit_quad();
        let h = four_point_homography(&quad, &quad).unwrap();
        assert_relative_eq!(h, Matrix3::identity(), epsilon = 1e-4);
    }

    #[test]
    fn pure_translation_recovered() {
        let src = unit_quad();
        let dst = src.map(|p| Point2::new(p.x + 30.0, p.y - 12.0));
        let h = four_point_homography(&src, &dst).unwrap();
        for p in &src {
            let q = apply_homography(&h, p).unwrap();
            assert_relative_eq!(q.x, p.x + 30.0, epsilon = 1e-2);
            assert_relative_eq!(q.y, p.y - 12.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn maps_corners_onto_projected_quad() {
        let src = unit_quad();
        let dst = [
            Point2::new(40.0, 22.0),
            Point2::new(790.0, 60.0),
            Point2::new(760.0, 440.0),
            Point2::new(25.0, 410.0),
        ];
        let h = four_point_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let q = apply_homography(&h, s).unwrap();
            assert_relative_eq!(q.x, d.x, epsilon = 1e-2);
            assert_relative_eq!(q.y, d.y, epsilon = 1e-2);
        }
    }

    #[test]
    fn collinear_corners_rejected() {
        let src = unit_quad();
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert!(four_point_homography(&src, &dst).is_none());
    }
}
