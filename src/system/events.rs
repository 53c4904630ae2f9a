//! Typed events crossing the boundary to the display layer.
//!
//! The core pushes these onto a channel; whatever runtime sits on the other
//! side (UI thread, IPC bridge) owns delivery. The payload types are serde-
//! serializable so an out-of-process consumer can be fed without extra glue.

use serde::{Deserialize, Serialize};

use crate::tracking::TrackingStatus;

/// Latest computed projector state, as consumed by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectorPoseUpdate {
    pub status: TrackingStatus,
    /// Column-major 4x4 view matrix (GL layout), handedness already flipped
    /// for the renderer. See [`crate::geometry::Pose::view_matrix`].
    pub view_matrix: [f32; 16],
    /// Pointer location in normalized content units.
    pub pointer_x: f32,
    pub pointer_y: f32,
}

impl Default for ProjectorPoseUpdate {
    fn default() -> Self {
        let mut view_matrix = [0.0; 16];
        view_matrix[0] = 1.0;
        view_matrix[5] = 1.0;
        view_matrix[10] = 1.0;
        view_matrix[15] = 1.0;
        Self {
            status: TrackingStatus::LostTracking,
            view_matrix,
            pointer_x: 0.0,
            pointer_y: 0.0,
        }
    }
}

/// Event stream emitted by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A frame produced an updated pose and pointer.
    PoseUpdated(ProjectorPoseUpdate),
    /// The engine is gone for good (tracker death or shutdown); no further
    /// events will follow.
    EngineDied,
}
