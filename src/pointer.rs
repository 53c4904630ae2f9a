//! Pointer estimation: intersect the projector's principal-axis ray with the
//! scene plane.
//!
//! The ray starts at the projector optical center and runs along the pose's
//! forward axis; where it pierces the world z=0 plane is where the projected
//! "pointer" lands. The intersection is scaled into normalized content units
//! and shifted by the calibrated y offset.

use nalgebra::{Point2, Vector3};

use crate::geometry::Pose;

/// A forward axis this close to parallel with the scene plane has no usable
/// intersection.
const MIN_AXIS_Z: f32 = 1e-6;

/// Pointer location in content units, or `None` for degenerate geometry
/// (axis parallel to the plane, or a zero object scale). Callers keep the
/// previous pointer in the degenerate case.
pub fn estimate_pointer(
    pose: &Pose,
    center: &Vector3<f32>,
    obj_scale: f32,
    y_calib: f32,
) -> Option<Point2<f32>> {
    let dir = pose.forward_axis();
    if dir.z.abs() < MIN_AXIS_Z || obj_scale.abs() < MIN_AXIS_Z {
        return None;
    }
    let t = -center.z / dir.z;
    let x = center.x + dir.x * t;
    let y = center.y + dir.y * t;
    Some(Point2::new(x / obj_scale, (y - y_calib) / obj_scale))
}
