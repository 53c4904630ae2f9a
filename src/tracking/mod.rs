//! Interface to the external feature tracker.
//!
//! The native feature-detection/pose-estimation library is an external
//! collaborator; this module pins down the contract the pipeline relies on:
//! a per-frame status code, a raw camera pose, and the camera's optical
//! center. Everything behind [`FeatureTracker::process`] (feature detection,
//! matching, PnP) is out of scope.

pub mod synthetic;

use anyhow::Result;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::calib::TrackerParams;
use crate::geometry::Pose;

pub use synthetic::SyntheticTracker;

/// Per-frame classification of the tracker's result.
///
/// Lost and not-enough-features are expected steady-state outcomes, not
/// errors; the pipeline stays live and the last good outputs persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// Tracking failed this frame; the pose output is meaningless.
    LostTracking,
    /// Tracking succeeded and the device is in motion.
    TrackingAndMoving,
    /// Tracking succeeded with the device held steady.
    TrackingStable,
    /// Too few features in the scene to attempt tracking.
    NotEnoughFeatures,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        Self::LostTracking
    }
}

/// Borrowed view of one luma (8-bit grayscale) camera frame.
///
/// The acquisition layer owns the buffer and guarantees `data` is tightly
/// packed at `width * height` bytes; stride handling happens upstream.
#[derive(Debug, Clone, Copy)]
pub struct LumaFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// What the tracker reports for one processed frame.
#[derive(Debug, Clone, Copy)]
pub struct TrackerOutput {
    pub status: TrackingStatus,
    /// Raw camera pose estimate, camera frame.
    pub camera_pose: Pose,
    /// Camera optical center in world coordinates.
    pub camera_center: Vector3<f32>,
}

/// Contract for the native tracking library.
///
/// `initialize` is called once at setup and again on every reset with the
/// current image dimensions. A setup-time failure is fatal to the pipeline;
/// per-frame failures are statuses, and an `Err` from `process` means the
/// tracker itself died.
pub trait FeatureTracker: Send {
    /// (Re)initialize internal state for the given image dimensions.
    fn initialize(&mut self, width: u32, height: u32, camera_k: &Matrix3<f32>) -> Result<()>;

    /// Hand the tracker the projector's intrinsics and the fixed
    /// camera-to-projector extrinsic.
    fn set_projector_info(
        &mut self,
        projector_k: &Matrix3<f32>,
        cam_to_proj: &Pose,
        proj_w: u32,
        proj_h: u32,
    ) -> Result<()>;

    /// Push tuning parameters (thresholds, sensitivities) down to the tracker.
    fn apply_params(&mut self, params: &TrackerParams) -> Result<()>;

    /// Track one frame.
    fn process(&mut self, frame: &LumaFrame<'_>) -> Result<TrackerOutput>;
}
