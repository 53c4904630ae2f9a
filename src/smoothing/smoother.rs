//! Temporal pose smoothing: warm-up/filter state machine plus exponential blend.

use crate::geometry::Pose;
use crate::tracking::TrackingStatus;

use super::butterworth::{ButterworthBank, NZEROS, POSE_CHANNELS};

/// Per-session pose smoother.
///
/// For the first five post-reset frames (`frame_count <= 4`) raw samples are
/// recorded into the filter history and pass through unfiltered. From the
/// sixth frame on, each pose component runs through its Butterworth channel.
/// Every frame except the very first post-reset one is then blended toward
/// the previous output: `out = prev + alpha * (in - prev)`.
///
/// The blend weight is a two-level policy on tracking status: a device that
/// is tracking and moving wants responsiveness (high alpha), anything else
/// wants stability (low alpha).
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    bank: ButterworthBank,
    prev: [f32; POSE_CHANNELS],
    frame_count: u32,
    filter_enabled: bool,
    alpha_moving: f32,
    alpha_stable: f32,
}

impl TemporalSmoother {
    pub fn new(filter_enabled: bool, alpha_moving: f32, alpha_stable: f32) -> Self {
        Self {
            bank: ButterworthBank::new(),
            prev: [0.0; POSE_CHANNELS],
            frame_count: 0,
            filter_enabled,
            alpha_moving,
            alpha_stable,
        }
    }

    /// Frames processed since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Restart warm-up. Filter state is re-primed by the next five frames,
    /// not reallocated, and the blend is skipped on the next frame.
    pub fn reset(&mut self) {
        self.frame_count = 0;
    }

    /// Smooth one pose. Advances the frame counter.
    pub fn apply(&mut self, pose: &Pose, status: TrackingStatus) -> Pose {
        let mut c = pose.to_components();

        if self.frame_count as usize <= NZEROS {
            self.bank.prime(self.frame_count as usize, &c);
        } else if self.filter_enabled {
            self.bank.filter(&mut c);
        }

        let alpha = if status == TrackingStatus::TrackingAndMoving {
            self.alpha_moving
        } else {
            self.alpha_stable
        };

        if self.frame_count > 0 {
            for (out, prev) in c.iter_mut().zip(self.prev.iter()) {
                *out = prev + alpha * (*out - prev);
            }
        }

        self.prev = c;
        self.frame_count += 1;
        Pose::from_components(&c)
    }
}
