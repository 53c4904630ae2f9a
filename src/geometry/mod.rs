//! Geometry primitives: rigid 3x4 poses and the four-point homography solver.

pub mod homography;
pub mod pose;

pub use homography::{apply_homography, four_point_homography};
pub use pose::Pose;
