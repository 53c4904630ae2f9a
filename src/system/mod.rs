//! Engine orchestration: the per-frame pipeline, the lock-and-property
//! surface around it, and the typed event stream to the display layer.

pub mod engine;
pub mod events;
pub mod pipeline;

pub use engine::{ProjectorPoseEngine, Property};
pub use events::{EngineEvent, ProjectorPoseUpdate};
pub use pipeline::{FrameStep, PosePipeline};
