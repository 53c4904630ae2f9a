//! Engine surface: serialization lock, runtime properties, event channel.
//!
//! Property mutations (reset, zoom) can arrive from a different execution
//! context than frame processing; one mutex serializes them against the
//! pipeline and also guards the latest-output buffer that a consumer
//! callback may read mid-session. Computed results leave through an
//! unbounded crossbeam channel as typed [`EngineEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use nalgebra::Matrix3;
use parking_lot::Mutex;
use tracing::error;

use crate::calib::EngineConfig;
use crate::tracking::{FeatureTracker, LumaFrame};

use super::events::{EngineEvent, ProjectorPoseUpdate};
use super::pipeline::{FrameStep, PosePipeline};

/// Runtime-settable properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Property {
    /// Reinitialize tracking on the next frame.
    Reset,
    /// Replace the virtual object scale and rebuild its corners.
    Zoom(f32),
}

/// Top-level engine: owns the pipeline, the lock, and the event channel.
pub struct ProjectorPoseEngine {
    core: Mutex<PosePipeline>,
    event_tx: Sender<EngineEvent>,
    dead: AtomicBool,
}

impl ProjectorPoseEngine {
    /// Bring up the pipeline. Tracker setup failure is fatal and surfaces
    /// here; missing configuration files were already defaulted upstream.
    ///
    /// Returns the engine together with the receiving end of its event
    /// stream.
    pub fn new(
        tracker: Box<dyn FeatureTracker>,
        config: EngineConfig,
        cam_w: u32,
        cam_h: u32,
    ) -> Result<(Self, Receiver<EngineEvent>)> {
        let (event_tx, event_rx) = unbounded();
        let core = PosePipeline::new(tracker, config, cam_w, cam_h)?;
        Ok((
            Self {
                core: Mutex::new(core),
                event_tx,
                dead: AtomicBool::new(false),
            },
            event_rx,
        ))
    }

    /// Feed one camera frame through the pipeline.
    ///
    /// Emits [`EngineEvent::PoseUpdated`] when the frame produced a new pose.
    /// A tracker error is fatal: the engine emits [`EngineEvent::EngineDied`],
    /// rejects further frames, and propagates the error.
    pub fn process_frame(&self, frame: &LumaFrame<'_>) -> Result<FrameStep> {
        if self.dead.load(Ordering::SeqCst) {
            bail!("engine has shut down");
        }
        let mut core = self.core.lock();
        match core.process_frame(frame) {
            Ok(step) => {
                if step.pose_updated {
                    let _ = self
                        .event_tx
                        .send(EngineEvent::PoseUpdated(core.latest().clone()));
                }
                Ok(step)
            }
            Err(e) => {
                drop(core);
                error!("tracker died: {e:#}");
                self.die();
                Err(e)
            }
        }
    }

    /// Apply a runtime property, serialized against frame processing.
    pub fn set_property(&self, property: Property) {
        let mut core = self.core.lock();
        match property {
            Property::Reset => core.request_reset(),
            Property::Zoom(scale) => core.set_object_scale(scale),
        }
    }

    /// Snapshot of the latest pose/pointer output.
    pub fn latest(&self) -> ProjectorPoseUpdate {
        self.core.lock().latest().clone()
    }

    /// Snapshot of the latest content warp homography.
    pub fn content_warp(&self) -> Matrix3<f32> {
        *self.core.lock().content_warp()
    }

    /// Stop the engine: emits the death notification once and rejects any
    /// frame submitted afterwards.
    pub fn shutdown(&self) {
        self.die();
    }

    fn die(&self) {
        if !self.dead.swap(true, Ordering::SeqCst) {
            let _ = self.event_tx.send(EngineEvent::EngineDied);
        }
    }
}

impl Drop for ProjectorPoseEngine {
    fn drop(&mut self) {
        self.die();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::synthetic::SyntheticTracker;
    use crate::tracking::TrackingStatus;

    const W: u32 = 64;
    const H: u32 = 48;

    fn engine() -> (ProjectorPoseEngine, Receiver<EngineEvent>) {
        let mut config = EngineConfig::default();
        config.scene.initial_delay = 0;
        ProjectorPoseEngine::new(Box::new(SyntheticTracker::stable()), config, W, H).unwrap()
    }

    fn feed(engine: &ProjectorPoseEngine) -> FrameStep {
        let data = vec![0u8; (W * H) as usize];
        let frame = LumaFrame {
            data: &data,
            width: W,
            height: H,
        };
        engine.process_frame(&frame).unwrap()
    }

    #[test]
    fn pose_update_event_per_tracked_frame() {
        let (engine, events) = engine();
        feed(&engine);
        match events.try_recv().unwrap() {
            EngineEvent::PoseUpdated(update) => {
                assert_eq!(update.status, TrackingStatus::TrackingStable);
                assert!(update.view_matrix.iter().all(|v| v.is_finite()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn reset_property_forces_lost_frame() {
        let (engine, _events) = engine();
        feed(&engine);
        engine.set_property(Property::Reset);
        let step = feed(&engine);
        assert_eq!(step.status, TrackingStatus::LostTracking);
        assert!(!step.pose_updated);
    }

    #[test]
    fn shutdown_emits_died_once_and_rejects_frames() {
        let (engine, events) = engine();
        engine.shutdown();
        engine.shutdown();
        assert!(matches!(events.try_recv().unwrap(), EngineEvent::EngineDied));
        assert!(events.try_recv().is_err());

        let data = vec![0u8; (W * H) as usize];
        let frame = LumaFrame {
            data: &data,
            width: W,
            height: H,
        };
        assert!(engine.process_frame(&frame).is_err());
    }

    #[test]
    fn zoom_property_rebuilds_content_warp() {
        let (engine, _events) = engine();
        feed(&engine);
        let before = engine.content_warp();
        engine.set_property(Property::Zoom(2.0));
        feed(&engine);
        let after = engine.content_warp();
        // Doubling the object scale doubles the projected quad, so the warp
        // must change measurably.
        let delta: f32 = (after - before).iter().map(|v| v.abs()).sum();
        assert!(delta > 1e-4, "warp unchanged after zoom: delta {delta}");
    }
}
