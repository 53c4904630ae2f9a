//! Per-frame pose pipeline: tracker invocation, reset state machine,
//! camera-to-projector transform, smoothing, content warp and pointer.
//!
//! One instance per AR session. The pipeline owns every piece of mutable
//! numeric state (filter history, previous pose, frame counter) so that a
//! reset is an explicit method over owned state, and processes exactly one
//! frame at a time.

use anyhow::{Context, Result};
use nalgebra::{Matrix3, Vector3};
use tracing::{debug, info};

use crate::calib::{CalibrationStore, EngineConfig, SceneParams};
use crate::geometry::Pose;
use crate::pointer::estimate_pointer;
use crate::projection::{
    content_warp_homography, image_coordinates, projection_matrix, VirtualObject,
};
use crate::smoothing::TemporalSmoother;
use crate::tracking::{FeatureTracker, LumaFrame, TrackingStatus};

use super::events::ProjectorPoseUpdate;

/// What happened to one submitted frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameStep {
    pub status: TrackingStatus,
    /// True when the view matrix and pointer were recomputed this frame.
    pub pose_updated: bool,
}

/// The per-frame numerical core.
pub struct PosePipeline {
    tracker: Box<dyn FeatureTracker>,
    calibration: CalibrationStore,
    scene: SceneParams,
    /// Calibrated pointer y offset, from the tracker parameter set.
    y_calib: f32,

    smoother: TemporalSmoother,
    object: VirtualObject,
    warp: Matrix3<f32>,

    /// Last raw camera pose from the tracker. Reused on frames where the
    /// tracker is skipped (not-enough-features short-circuit) so smoothing
    /// keeps converging on the last known geometry.
    camera_pose: Pose,
    prev_status: TrackingStatus,
    pending_reset: bool,
    /// Camera frames seen, including the initial-delay frames that are
    /// skipped outright.
    captured_frames: u64,

    update: ProjectorPoseUpdate,
}

impl PosePipeline {
    /// Build the pipeline and bring up the tracker. Tracker initialization
    /// failure is fatal; missing configuration was already defaulted by the
    /// time the `EngineConfig` exists.
    pub fn new(
        mut tracker: Box<dyn FeatureTracker>,
        config: EngineConfig,
        cam_w: u32,
        cam_h: u32,
    ) -> Result<Self> {
        let EngineConfig {
            mut calibration,
            tracker: tracker_params,
            smoothing,
            scene,
        } = config;

        calibration.recenter_projector_principal_point(scene.proj_w, scene.proj_h);

        tracker
            .initialize(cam_w, cam_h, &calibration.camera_k)
            .context("initializing feature tracker")?;
        tracker
            .set_projector_info(
                &calibration.projector_k,
                &calibration.cam_to_proj,
                scene.proj_w,
                scene.proj_h,
            )
            .context("configuring tracker projector info")?;
        tracker
            .apply_params(&tracker_params)
            .context("applying tracker parameters")?;

        let object = Self::build_object(&scene);
        let smoother = TemporalSmoother::new(
            smoothing.enable_filter,
            smoothing.alpha_moving,
            smoothing.alpha_stable,
        );

        info!(
            cam_w,
            cam_h,
            proj_w = scene.proj_w,
            proj_h = scene.proj_h,
            initial_delay = scene.initial_delay,
            "pose pipeline ready"
        );

        Ok(Self {
            tracker,
            calibration,
            y_calib: tracker_params.projector_y_coord as f32,
            scene,
            smoother,
            object,
            warp: Matrix3::identity(),
            camera_pose: Pose::identity(),
            prev_status: TrackingStatus::LostTracking,
            pending_reset: false,
            captured_frames: 0,
            update: ProjectorPoseUpdate::default(),
        })
    }

    fn build_object(scene: &SceneParams) -> VirtualObject {
        let aspect = scene.proj_w as f32 / scene.proj_h as f32;
        VirtualObject::rectangle(
            Vector3::new(scene.obj_x, scene.obj_y, scene.obj_z),
            scene.obj_scale,
            aspect,
        )
    }

    /// Process one camera frame.
    ///
    /// Frames within the initial delay are skipped with a zeroed pointer.
    /// A lost-tracking frame resets the smoother and leaves the previous
    /// outputs standing; every other tracked frame runs the full transform,
    /// smooth, warp and pointer chain.
    pub fn process_frame(&mut self, frame: &LumaFrame<'_>) -> Result<FrameStep> {
        self.captured_frames += 1;
        if self.captured_frames <= self.scene.initial_delay as u64 {
            self.update.pointer_x = 0.0;
            self.update.pointer_y = 0.0;
            return Ok(FrameStep {
                status: self.update.status,
                pose_updated: false,
            });
        }

        let status = if self.pending_reset {
            self.tracker
                .initialize(frame.width, frame.height, &self.calibration.camera_k)
                .context("reinitializing feature tracker after reset")?;
            self.pending_reset = false;
            info!("tracker reset");
            TrackingStatus::LostTracking
        } else if self.prev_status == TrackingStatus::NotEnoughFeatures {
            // Don't burn another tracking attempt on a scene that just
            // failed for lack of features; only a reset clears this state.
            TrackingStatus::NotEnoughFeatures
        } else {
            let output = self.tracker.process(frame)?;
            self.camera_pose = output.camera_pose;
            output.status
        };
        self.prev_status = status;
        self.update.status = status;

        if status == TrackingStatus::LostTracking {
            // Warm-up restarts on the next tracked frame; the consumer keeps
            // seeing the last good pose and pointer.
            self.smoother.reset();
            return Ok(FrameStep {
                status,
                pose_updated: false,
            });
        }

        let mut proj_pose = self.calibration.cam_to_proj.compose(&self.camera_pose);
        proj_pose.displace_along_axis(self.scene.projector_displacement);
        let smoothed = self.smoother.apply(&proj_pose, status);

        let p = projection_matrix(&self.calibration.projector_k, &smoothed);
        let projector_center = smoothed.center();
        let (proj_w, proj_h) = (self.scene.proj_w as f32, self.scene.proj_h as f32);

        for face in &self.object.faces {
            match image_coordinates(&p, face, proj_w, proj_h) {
                Some(corners) => match content_warp_homography(proj_w, proj_h, &corners) {
                    Some(h) => self.warp = h,
                    None => debug!("degenerate corner quad, keeping previous warp"),
                },
                None => debug!("object corner at zero depth, keeping previous warp"),
            }
        }

        match estimate_pointer(&smoothed, &projector_center, self.scene.obj_scale, self.y_calib)
        {
            Some(pointer) => {
                self.update.pointer_x = pointer.x;
                self.update.pointer_y = pointer.y;
            }
            None => debug!("principal axis parallel to scene plane, keeping previous pointer"),
        }

        self.update
            .view_matrix
            .copy_from_slice(smoothed.view_matrix().as_slice());

        Ok(FrameStep {
            status,
            pose_updated: true,
        })
    }

    /// Schedule a tracker reset for the next processed frame.
    pub fn request_reset(&mut self) {
        self.pending_reset = true;
    }

    /// Runtime zoom: replace the object scale and rebuild the face corners.
    pub fn set_object_scale(&mut self, scale: f32) {
        self.scene.obj_scale = scale;
        self.object = Self::build_object(&self.scene);
        debug!(scale, "virtual object rescaled");
    }

    /// Latest pose/pointer output.
    pub fn latest(&self) -> &ProjectorPoseUpdate {
        &self.update
    }

    /// Latest content warp homography.
    pub fn content_warp(&self) -> &Matrix3<f32> {
        &self.warp
    }

    /// Frames smoothed since the last tracking reset.
    pub fn smoothed_frame_count(&self) -> u32 {
        self.smoother.frame_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::EngineConfig;
    use crate::tracking::synthetic::{SyntheticTracker, TrackerCalls};
    use crate::tracking::TrackingStatus::*;

    const W: u32 = 64;
    const H: u32 = 48;

    fn pipeline_with(script: Vec<TrackingStatus>, initial_delay: u32) -> (PosePipeline, TrackerCalls) {
        let tracker = SyntheticTracker::with_script(script);
        let calls = tracker.calls();
        let mut config = EngineConfig::default();
        config.scene.initial_delay = initial_delay;
        let pipeline = PosePipeline::new(Box::new(tracker), config, W, H).unwrap();
        (pipeline, calls)
    }

    fn step(pipeline: &mut PosePipeline) -> FrameStep {
        let data = vec![0u8; (W * H) as usize];
        let frame = LumaFrame {
            data: &data,
            width: W,
            height: H,
        };
        pipeline.process_frame(&frame).unwrap()
    }

    #[test]
    fn initial_delay_skips_frames_and_zeroes_pointer() {
        let (mut pipeline, calls) = pipeline_with(Vec::new(), 3);
        for _ in 0..3 {
            let out = step(&mut pipeline);
            assert!(!out.pose_updated);
        }
        assert_eq!(calls.process(), 0);
        assert_eq!(pipeline.latest().pointer_x, 0.0);
        assert_eq!(pipeline.latest().pointer_y, 0.0);

        let out = step(&mut pipeline);
        assert!(out.pose_updated);
        assert_eq!(calls.process(), 1);
    }

    #[test]
    fn lost_tracking_resets_frame_counter() {
        let (mut pipeline, _) = pipeline_with(
            vec![TrackingStable, TrackingStable, LostTracking, TrackingAndMoving],
            0,
        );
        step(&mut pipeline);
        step(&mut pipeline);
        assert_eq!(pipeline.smoothed_frame_count(), 2);

        let out = step(&mut pipeline);
        assert_eq!(out.status, LostTracking);
        assert!(!out.pose_updated);
        assert_eq!(pipeline.smoothed_frame_count(), 0);

        // The next tracked frame starts warm-up over, even while moving.
        let out = step(&mut pipeline);
        assert_eq!(out.status, TrackingAndMoving);
        assert!(out.pose_updated);
        assert_eq!(pipeline.smoothed_frame_count(), 1);
    }

    #[test]
    fn not_enough_features_short_circuits_tracker() {
        let (mut pipeline, calls) = pipeline_with(vec![NotEnoughFeatures, TrackingStable], 0);
        let out = step(&mut pipeline);
        assert_eq!(out.status, NotEnoughFeatures);
        assert_eq!(calls.process(), 1);

        // Second frame reuses the cached status without touching the tracker.
        let out = step(&mut pipeline);
        assert_eq!(out.status, NotEnoughFeatures);
        assert_eq!(calls.process(), 1);

        // Pose math keeps running on the stale camera pose meanwhile.
        assert!(out.pose_updated);
    }

    #[test]
    fn reset_reinitializes_tracker_and_forces_lost() {
        let (mut pipeline, calls) = pipeline_with(Vec::new(), 0);
        step(&mut pipeline);
        assert_eq!(calls.initialize(), 1);

        pipeline.request_reset();
        let out = step(&mut pipeline);
        assert_eq!(out.status, LostTracking);
        assert!(!out.pose_updated);
        assert_eq!(calls.initialize(), 2);
        assert_eq!(pipeline.smoothed_frame_count(), 0);

        // Reset also clears a stuck not-enough-features state.
        let out = step(&mut pipeline);
        assert_eq!(out.status, TrackingStable);
        assert!(out.pose_updated);
    }

    #[test]
    fn reset_recovers_from_not_enough_features() {
        let (mut pipeline, calls) = pipeline_with(vec![NotEnoughFeatures], 0);
        step(&mut pipeline);
        step(&mut pipeline);
        assert_eq!(calls.process(), 1);

        pipeline.request_reset();
        step(&mut pipeline);
        let out = step(&mut pipeline);
        assert_eq!(out.status, TrackingStable);
        assert_eq!(calls.process(), 2);
    }

    #[test]
    fn tracked_frames_produce_finite_outputs() {
        let (mut pipeline, _) = pipeline_with(Vec::new(), 0);
        for _ in 0..10 {
            step(&mut pipeline);
        }
        let update = pipeline.latest();
        assert!(update.view_matrix.iter().all(|v| v.is_finite()));
        assert!(update.pointer_x.is_finite());
        assert!(update.pointer_y.is_finite());
        assert!(pipeline.content_warp().iter().all(|v| v.is_finite()));
        // The synthetic camera hovers over the origin; the pointer stays in
        // the neighborhood of the content center.
        assert!(update.pointer_x.abs() < 10.0);
    }

    #[test]
    fn zoom_rebuilds_object_corners() {
        let (mut pipeline, _) = pipeline_with(Vec::new(), 0);
        let before = pipeline.object.faces[0].corners[1].x;
        pipeline.set_object_scale(3.0);
        let after = pipeline.object.faces[0].corners[1].x;
        assert!(after > before);
    }
}
