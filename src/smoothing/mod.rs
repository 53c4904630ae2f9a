//! Temporal smoothing of the projector pose: a per-component Butterworth
//! low-pass bank plus a status-weighted exponential blend.

pub mod butterworth;
pub mod smoother;

pub use butterworth::{ButterworthBank, GAIN, NPOLES, NZEROS, POSE_CHANNELS};
pub use smoother::TemporalSmoother;
