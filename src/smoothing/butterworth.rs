//! Bank of 4th-order Butterworth low-pass filters, one per pose component.
//!
//! Coefficients were generated with A.J. Fisher's mkfilter for a 5 Hz cutoff
//! at the 30 fps camera rate (`mkfilter -Bu -Lp -o 4 -a 1.6666666667e-1`).
//! The DC gain is unity by construction: a constant input settles to itself.

/// History depth on the raw side (filter order in zeros).
pub const NZEROS: usize = 4;
/// History depth on the filtered side.
pub const NPOLES: usize = 4;
/// Input scale divisor paired with the recurrence below.
pub const GAIN: f32 = 3.834690819e+01;
/// Number of independent channels: the 12 components of a 3x4 pose.
pub const POSE_CHANNELS: usize = 12;

const A0: f32 = -0.0557639007;
const A1: f32 = 0.3623690447;
const A2: f32 = -1.0304538354;
const A3: f32 = 1.3066051440;

/// Shift-register state for all 12 pose channels.
///
/// `xv` holds the 5 most recent gain-scaled raw samples, `yv` the 5 most
/// recent filtered outputs. State persists across frames; a tracking reset
/// re-primes it through [`ButterworthBank::prime`] rather than reallocating.
#[derive(Debug, Clone)]
pub struct ButterworthBank {
    xv: [[f32; NZEROS + 1]; POSE_CHANNELS],
    yv: [[f32; NPOLES + 1]; POSE_CHANNELS],
}

impl ButterworthBank {
    pub fn new() -> Self {
        Self {
            xv: [[0.0; NZEROS + 1]; POSE_CHANNELS],
            yv: [[0.0; NPOLES + 1]; POSE_CHANNELS],
        }
    }

    /// Record a warm-up sample directly into history slot `slot` (0..=4).
    ///
    /// During warm-up the registers are written in place instead of shifted,
    /// so that after five samples the filter starts from a fully primed
    /// state. For a constant input this lands exactly on the DC fixed point.
    pub fn prime(&mut self, slot: usize, raw: &[f32; POSE_CHANNELS]) {
        debug_assert!(slot <= NZEROS);
        for ch in 0..POSE_CHANNELS {
            self.xv[ch][slot] = raw[ch] / GAIN;
            self.yv[ch][slot] = raw[ch];
        }
    }

    /// Run one filter step over all channels, in place.
    pub fn filter(&mut self, sample: &mut [f32; POSE_CHANNELS]) {
        for ch in 0..POSE_CHANNELS {
            let xv = &mut self.xv[ch];
            let yv = &mut self.yv[ch];

            xv[0] = xv[1];
            xv[1] = xv[2];
            xv[2] = xv[3];
            xv[3] = xv[4];
            xv[4] = sample[ch] / GAIN;
            yv[0] = yv[1];
            yv[1] = yv[2];
            yv[2] = yv[3];
            yv[3] = yv[4];

            yv[4] = (xv[0] + xv[4])
                + 4.0 * (xv[1] + xv[3])
                + 6.0 * xv[2]
                + A0 * yv[0]
                + A1 * yv[1]
                + A2 * yv[2]
                + A3 * yv[3];

            sample[ch] = yv[4];
        }
    }
}

impl Default for ButterworthBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unity_dc_gain_after_priming() {
        let mut bank = ButterworthBank::new();
        let constant = [3.25_f32; POSE_CHANNELS];
        for slot in 0..=NZEROS {
            bank.prime(slot, &constant);
        }
        // The primed state is the DC fixed point; further constant input
        // must reproduce itself.
        for _ in 0..20 {
            let mut sample = constant;
            bank.filter(&mut sample);
            for v in sample {
                assert_relative_eq!(v, 3.25, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn step_response_converges_to_step_level() {
        let mut bank = ButterworthBank::new();
        let zeros = [0.0_f32; POSE_CHANNELS];
        for slot in 0..=NZEROS {
            bank.prime(slot, &zeros);
        }
        let mut last = [0.0_f32; POSE_CHANNELS];
        for _ in 0..200 {
            last = [10.0; POSE_CHANNELS];
            bank.filter(&mut last);
        }
        for v in last {
            assert_relative_eq!(v, 10.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn attenuates_alternating_input() {
        let mut bank = ButterworthBank::new();
        let zeros = [0.0_f32; POSE_CHANNELS];
        for slot in 0..=NZEROS {
            bank.prime(slot, &zeros);
        }
        // 15 Hz square wave at a 30 fps sample rate sits well above the
        // 5 Hz cutoff; the output swing must shrink.
        let mut peak = 0.0_f32;
        for i in 0..60 {
            let level = if i % 2 == 0 { 1.0 } else { -1.0 };
            let mut sample = [level; POSE_CHANNELS];
            bank.filter(&mut sample);
            if i > 20 {
                peak = peak.max(sample[0].abs());
            }
        }
        assert!(peak < 0.3, "alternating input not attenuated: peak {peak}");
    }
}
