use std::path::Path;

use anyhow::Result;
use tracing::info;

use projector_pose::calib::EngineConfig;
use projector_pose::system::{EngineEvent, ProjectorPoseEngine, Property};
use projector_pose::tracking::{LumaFrame, SyntheticTracker};

const CAM_W: u32 = 320;
const CAM_H: u32 = 240;

/// Drives the pose pipeline with a synthetic tracker for a couple of
/// seconds' worth of frames and logs what a renderer would consume.
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config = EngineConfig::load_or_default(Path::new(&config_dir));

    let tracker = SyntheticTracker::stable();
    let (engine, events) = ProjectorPoseEngine::new(Box::new(tracker), config, CAM_W, CAM_H)?;

    let luma = vec![0u8; (CAM_W * CAM_H) as usize];
    let frame = LumaFrame {
        data: &luma,
        width: CAM_W,
        height: CAM_H,
    };

    for i in 0..120 {
        engine.process_frame(&frame)?;

        // Exercise the runtime property surface mid-run.
        if i == 60 {
            engine.set_property(Property::Zoom(2.0));
        }
        if i == 90 {
            engine.set_property(Property::Reset);
        }

        while let Ok(event) = events.try_recv() {
            if let EngineEvent::PoseUpdated(update) = event {
                if i % 30 == 0 {
                    info!(
                        frame = i,
                        status = ?update.status,
                        pointer_x = update.pointer_x,
                        pointer_y = update.pointer_y,
                        "pose update"
                    );
                }
            }
        }
    }

    let last = engine.latest();
    info!(
        status = ?last.status,
        pointer_x = last.pointer_x,
        pointer_y = last.pointer_y,
        "final state"
    );

    engine.shutdown();
    assert!(matches!(events.recv()?, EngineEvent::EngineDied));
    Ok(())
}
