//! Projection of the virtual object into projector image space and the
//! content warp homography.
//!
//! The virtual object is a single rectangular face on the scene plane. Each
//! frame its world corners are projected through the projector's combined
//! intrinsic/extrinsic matrix; the homography that maps the full-resolution
//! content rectangle onto that quadrilateral is what the renderer uses to
//! pre-warp digital content before projection.

use nalgebra::{Matrix3, Matrix3x4, Point2, Vector3, Vector4};

use crate::geometry::{four_point_homography, Pose};

/// Corners with projected depth closer to the image plane than this are
/// treated as degenerate geometry.
const MIN_DEPTH: f32 = 1e-6;

/// One planar face: four homogeneous world-space corners.
#[derive(Debug, Clone)]
pub struct Face {
    pub corners: [Vector4<f32>; 4],
}

/// Small planar mesh placed in the tracked scene.
#[derive(Debug, Clone)]
pub struct VirtualObject {
    pub faces: Vec<Face>,
}

impl VirtualObject {
    /// Single rectangular face centered at `center` with half-width `scale`
    /// and half-height `scale / aspect`.
    ///
    /// Corner order is top-left, top-right, bottom-right, bottom-left in
    /// world y-up terms; it must stay index-aligned with the source
    /// rectangle corners in [`content_warp_homography`], which is the
    /// correctness contract of the warp.
    pub fn rectangle(center: Vector3<f32>, scale: f32, aspect: f32) -> Self {
        let ox = scale;
        let oy = scale / aspect;
        let corner = |dx: f32, dy: f32| {
            Vector4::new(center.x + dx, center.y + dy, center.z, 1.0)
        };
        Self {
            faces: vec![Face {
                corners: [
                    corner(-ox, oy),
                    corner(ox, oy),
                    corner(ox, -oy),
                    corner(-ox, -oy),
                ],
            }],
        }
    }
}

/// Combined projector matrix `P = K * [R | t]`.
pub fn projection_matrix(k: &Matrix3<f32>, pose: &Pose) -> Matrix3x4<f32> {
    k * pose.as_matrix3x4()
}

/// Project a face's corners into image coordinates centered on the image
/// origin: perspective divide plus a half-image offset.
///
/// `None` when any corner projects with (near-)zero depth; callers keep
/// their previous warp for that frame instead of consuming garbage corners.
pub fn image_coordinates(
    p: &Matrix3x4<f32>,
    face: &Face,
    img_w: f32,
    img_h: f32,
) -> Option<[Point2<f32>; 4]> {
    let mut out = [Point2::origin(); 4];
    for (slot, corner) in out.iter_mut().zip(face.corners.iter()) {
        let projected = p * corner;
        if projected.z.abs() < MIN_DEPTH {
            return None;
        }
        *slot = Point2::new(
            projected.x / projected.z + 0.5 * img_w,
            projected.y / projected.z + 0.5 * img_h,
        );
    }
    Some(out)
}

/// Homography warping the full-resolution content rectangle
/// `(0,0)-(proj_w,proj_h)` onto the projected corner quadrilateral.
///
/// Source corner order (origin, +x, +x+y, +y) corresponds index-for-index
/// to the [`VirtualObject::rectangle`] winding.
pub fn content_warp_homography(
    proj_w: f32,
    proj_h: f32,
    corners: &[Point2<f32>; 4],
) -> Option<Matrix3<f32>> {
    let src = [
        Point2::new(0.0, 0.0),
        Point2::new(proj_w, 0.0),
        Point2::new(proj_w, proj_h),
        Point2::new(0.0, proj_h),
    ];
    four_point_homography(&src, corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn looking_down_pose(height: f32) -> Pose {
        // Optical axis along -z, centered above the origin.
        let rotation = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        let center = Vector3::new(0.0, 0.0, height);
        Pose::new(rotation, -(rotation * center))
    }

    #[test]
    fn rectangle_winding_is_stable() {
        let obj = VirtualObject::rectangle(Vector3::new(1.0, 2.0, 0.0), 3.0, 1.5);
        let face = &obj.faces[0];
        assert_relative_eq!(face.corners[0].x, -2.0);
        assert_relative_eq!(face.corners[0].y, 4.0);
        assert_relative_eq!(face.corners[1].x, 4.0);
        assert_relative_eq!(face.corners[1].y, 4.0);
        assert_relative_eq!(face.corners[2].x, 4.0);
        assert_relative_eq!(face.corners[2].y, 0.0);
        assert_relative_eq!(face.corners[3].x, -2.0);
        assert_relative_eq!(face.corners[3].y, 0.0);
        for c in &face.corners {
            assert_relative_eq!(c.w, 1.0);
        }
    }

    #[test]
    fn centered_object_projects_to_image_center() {
        let pose = looking_down_pose(10.0);
        let k = Matrix3::new(500.0, 0.0, 0.0, 0.0, 500.0, 0.0, 0.0, 0.0, 1.0);
        let p = projection_matrix(&k, &pose);
        let obj = VirtualObject::rectangle(Vector3::zeros(), 1.0, 1.0);
        let pts = image_coordinates(&p, &obj.faces[0], 854.0, 480.0).unwrap();
        // Corners are symmetric around the (offset) image center.
        let cx: f32 = pts.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let cy: f32 = pts.iter().map(|p| p.y).sum::<f32>() / 4.0;
        assert_relative_eq!(cx, 427.0, epsilon = 1e-2);
        assert_relative_eq!(cy, 240.0, epsilon = 1e-2);
    }

    #[test]
    fn zero_depth_corner_is_rejected() {
        // Sensor sitting in the object plane: every corner has zero depth.
        let pose = looking_down_pose(0.0);
        let k = Matrix3::identity();
        let p = projection_matrix(&k, &pose);
        let obj = VirtualObject::rectangle(Vector3::zeros(), 1.0, 1.0);
        assert!(image_coordinates(&p, &obj.faces[0], 854.0, 480.0).is_none());
    }

    #[test]
    fn warp_is_identity_for_identity_corners() {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(854.0, 0.0),
            Point2::new(854.0, 480.0),
            Point2::new(0.0, 480.0),
        ];
        let h = content_warp_homography(854.0, 480.0, &corners).unwrap();
        assert_relative_eq!(h, Matrix3::identity(), epsilon = 1e-4);
    }
}
