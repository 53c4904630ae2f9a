//! Deterministic tracker substitute for the demo binary and pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Result};
use nalgebra::{Matrix3, Rotation3, Vector3};
use tracing::debug;

use crate::calib::TrackerParams;
use crate::geometry::Pose;

use super::{FeatureTracker, LumaFrame, TrackerOutput, TrackingStatus};

/// Shared call counters, observable after the tracker has been boxed and
/// moved into the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TrackerCalls {
    process: Arc<AtomicUsize>,
    initialize: Arc<AtomicUsize>,
}

impl TrackerCalls {
    pub fn process(&self) -> usize {
        self.process.load(Ordering::SeqCst)
    }

    pub fn initialize(&self) -> usize {
        self.initialize.load(Ordering::SeqCst)
    }
}

/// Scripted tracker: replays a fixed status sequence while sweeping the
/// camera through a gentle arc in front of the scene.
///
/// Once the script runs out it keeps reporting [`TrackingStatus::TrackingStable`].
#[derive(Debug, Clone)]
pub struct SyntheticTracker {
    script: Vec<TrackingStatus>,
    calls: TrackerCalls,
    width: u32,
    height: u32,
}

impl SyntheticTracker {
    /// Tracker that always reports stable tracking.
    pub fn stable() -> Self {
        Self::with_script(Vec::new())
    }

    /// Tracker that replays `script` one status per `process` call.
    pub fn with_script(script: Vec<TrackingStatus>) -> Self {
        Self {
            script,
            calls: TrackerCalls::default(),
            width: 0,
            height: 0,
        }
    }

    /// Handle onto the call counters; stays valid after the tracker is boxed.
    pub fn calls(&self) -> TrackerCalls {
        self.calls.clone()
    }

    fn pose_at(step: usize) -> Pose {
        // Slow yaw sweep around a fixed standoff, optical axis aimed down
        // at the z=0 scene plane.
        let angle = 0.002 * step as f32;
        let facing = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f32::consts::PI);
        let rotation = (Rotation3::from_euler_angles(0.0, angle, 0.0) * facing).into_inner();
        let center = Vector3::new(2.0 * angle.sin(), 0.0, 40.0);
        let translation = -(rotation * center);
        Pose::new(rotation, translation)
    }
}

impl FeatureTracker for SyntheticTracker {
    fn initialize(&mut self, width: u32, height: u32, _camera_k: &Matrix3<f32>) -> Result<()> {
        ensure!(width > 0 && height > 0, "zero-sized image plane");
        self.width = width;
        self.height = height;
        self.calls.initialize.fetch_add(1, Ordering::SeqCst);
        debug!(width, height, "synthetic tracker initialized");
        Ok(())
    }

    fn set_projector_info(
        &mut self,
        _projector_k: &Matrix3<f32>,
        _cam_to_proj: &Pose,
        _proj_w: u32,
        _proj_h: u32,
    ) -> Result<()> {
        Ok(())
    }

    fn apply_params(&mut self, _params: &TrackerParams) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, frame: &LumaFrame<'_>) -> Result<TrackerOutput> {
        ensure!(
            frame.data.len() >= (frame.width * frame.height) as usize,
            "luma buffer shorter than {}x{}",
            frame.width,
            frame.height
        );
        let step = self.calls.process.fetch_add(1, Ordering::SeqCst);
        let status = self
            .script
            .get(step)
            .copied()
            .unwrap_or(TrackingStatus::TrackingStable);
        let camera_pose = Self::pose_at(step);
        Ok(TrackerOutput {
            status,
            camera_pose,
            camera_center: camera_pose.center(),
        })
    }
}
