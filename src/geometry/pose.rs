//! Rigid 3x4 pose (rotation + translation) with the named operations the
//! projector pipeline needs.
//!
//! A `Pose` maps world coordinates into the sensor frame: `x_sensor = R x_world + t`.
//! The tracker produces camera-frame poses; composing with the fixed
//! camera-to-projector extrinsic yields projector-frame poses. The smoothing
//! filter operates on the row-major 12-component view of the pose.

use nalgebra::{Matrix3, Matrix3x4, Matrix4, Vector3};

/// Rigid transform in `[R | t]` form, single precision.
///
/// The rotation block is assumed (near-)orthonormal when the pose comes from
/// a valid tracker result. `center` and `displace_along_axis` rely on
/// `R^-1 = R^T`; garbage rotations produce garbage centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl Pose {
    pub fn new(rotation: Matrix3<f32>, translation: Vector3<f32>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Compose two rigid transforms: `self * other`.
    ///
    /// `[R1|t1] * [R2|t2] = [R1 R2 | R1 t2 + t1]`. With `self` the
    /// camera-to-projector extrinsic and `other` the camera pose, the result
    /// is the projector pose.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Optical center of the sensor in world coordinates: `C = -R^T t`.
    pub fn center(&self) -> Vector3<f32> {
        -(self.rotation.transpose() * self.translation)
    }

    /// World-space direction of the sensor's principal (optical) axis.
    ///
    /// This is `R^T e_z`, i.e. the third row of the rotation block read as a
    /// column vector.
    pub fn forward_axis(&self) -> Vector3<f32> {
        self.rotation.row(2).transpose()
    }

    /// Shift the sensor's optical center along the world z axis by `offset`
    /// and rebuild the translation column.
    ///
    /// Recovers `C = -R^T t`, adds `offset` to `C.z`, then sets `t = -R C`.
    /// A positive offset moves the projector toward the world origin along
    /// its facing direction; this matches the physical projector-offset
    /// calibration convention.
    pub fn displace_along_axis(&mut self, offset: f32) {
        let mut c = self.center();
        c.z += offset;
        self.translation = -(self.rotation * c);
    }

    /// Row-major 12-component view: `[r00 r01 r02 t0, r10 ... t1, r20 ... t2]`.
    pub fn to_components(&self) -> [f32; 12] {
        let r = &self.rotation;
        let t = &self.translation;
        [
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            t.x,
            r[(1, 0)],
            r[(1, 1)],
            r[(1, 2)],
            t.y,
            r[(2, 0)],
            r[(2, 1)],
            r[(2, 2)],
            t.z,
        ]
    }

    /// Inverse of [`Pose::to_components`].
    pub fn from_components(c: &[f32; 12]) -> Pose {
        Pose {
            rotation: Matrix3::new(c[0], c[1], c[2], c[4], c[5], c[6], c[8], c[9], c[10]),
            translation: Vector3::new(c[3], c[7], c[11]),
        }
    }

    /// The pose as a plain 3x4 matrix, for intrinsic multiplication.
    pub fn as_matrix3x4(&self) -> Matrix3x4<f32> {
        let r = &self.rotation;
        let t = &self.translation;
        Matrix3x4::new(
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            t.x,
            r[(1, 0)],
            r[(1, 1)],
            r[(1, 2)],
            t.y,
            r[(2, 0)],
            r[(2, 1)],
            r[(2, 2)],
            t.z,
        )
    }

    /// Renderer view matrix: row 0 is the pose's first row, rows 1 and 2 are
    /// the negated second and third rows (handedness flip for the consuming
    /// GL renderer), bottom row is the homogeneous identity row.
    ///
    /// Flatten with [`Matrix4::as_slice`] for the column-major 16-float
    /// layout the display layer expects.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let r = &self.rotation;
        let t = &self.translation;
        Matrix4::new(
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            t.x,
            -r[(1, 0)],
            -r[(1, 1)],
            -r[(1, 2)],
            -t.y,
            -r[(2, 0)],
            -r[(2, 1)],
            -r[(2, 2)],
            -t.z,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
