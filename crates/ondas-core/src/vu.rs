//! VU meter ballistics: peak, RMS, LED, and peak-hold tracking.
//!
//! The smoothing constants are fixed rather than derived from the host
//! sample rate; meters read the same at 44.1 and 96 kHz because they are
//! updated per block, not per sample.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::{fabs, sqrt};

use crate::stream::MAX_CHANNELS;
use crate::{CoreError, Result};

/// Samples a peak-hold value persists before falling (0.5 s at 44.1 kHz).
pub const PEAK_HOLD_SAMPLES: usize = 22050;

const METER_ATTACK: f64 = 0.8;
const METER_DECAY: f64 = 0.12;
const RMS_TIME_CONST: f64 = 0.1;
const LED_ATTACK: f64 = 1.0;
const LED_DECAY: f64 = 0.4;

/// Seven LED levels: below the first threshold is dark, at or above the last
/// is the over lamp.
const LED_THRESHOLDS: [f64; 6] = [0.001, 0.01, 0.1, 0.2, 0.4, 1.0];

/// Per-block meter state for up to [`MAX_CHANNELS`] channels.
///
/// # Example
///
/// ```rust
/// use ondas_core::VuBallistics;
///
/// let mut vu = VuBallistics::new(2);
/// let left = [0.5; 512];
/// let right = [0.25; 512];
/// vu.update(&[&left[..], &right[..]]).unwrap();
/// assert!(vu.peak() > 0.0);
/// assert!(!vu.over());
/// ```
#[derive(Debug, Clone)]
pub struct VuBallistics {
    last_peak: f64,
    last_rms: f64,
    last_peak_hold: f64,
    peak_hold_time: usize,
    channel_peaks: Vec<f64>,
    channel_peak_holds: Vec<f64>,
    channel_hold_times: Vec<usize>,
    peak_hold_samples: usize,
}

impl VuBallistics {
    /// Creates meters for `num_channels` channels with the default
    /// [`PEAK_HOLD_SAMPLES`] hold time.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` is 0 or exceeds [`MAX_CHANNELS`].
    pub fn new(num_channels: usize) -> Self {
        Self::with_hold_samples(num_channels, PEAK_HOLD_SAMPLES)
    }

    /// Creates meters with a custom peak-hold time in samples.
    pub fn with_hold_samples(num_channels: usize, peak_hold_samples: usize) -> Self {
        assert!(
            num_channels > 0 && num_channels <= MAX_CHANNELS,
            "Channel count out of range"
        );

        Self {
            last_peak: 0.0,
            last_rms: 0.0,
            last_peak_hold: 0.0,
            peak_hold_time: 0,
            channel_peaks: vec![0.0; num_channels],
            channel_peak_holds: vec![0.0; num_channels],
            channel_hold_times: vec![0; num_channels],
            peak_hold_samples,
        }
    }

    /// Feeds one block of per-channel buffers into the meters.
    pub fn update<S: AsRef<[f64]>>(&mut self, blocks: &[S]) -> Result<()> {
        let k = blocks.len();
        if k == 0 || k > self.channel_peaks.len() {
            return Err(CoreError::ShapeMismatch("channel count out of range"));
        }
        let n = blocks[0].as_ref().len();
        for block in blocks {
            if block.as_ref().len() != n {
                return Err(CoreError::ShapeMismatch("ragged input block"));
            }
        }
        if n == 0 {
            return Ok(());
        }

        let mut block_peak: f64 = 0.0;
        let mut sum_squares = 0.0;
        for (ch, block) in blocks.iter().enumerate() {
            let mut channel_peak: f64 = 0.0;
            for &sample in block.as_ref() {
                let magnitude = fabs(sample);
                channel_peak = channel_peak.max(magnitude);
                sum_squares += sample * sample;
            }
            block_peak = block_peak.max(channel_peak);

            self.channel_peaks[ch] += smoothing(channel_peak, self.channel_peaks[ch], LED_ATTACK, LED_DECAY)
                * (channel_peak - self.channel_peaks[ch]);
            hold(
                &mut self.channel_peak_holds[ch],
                &mut self.channel_hold_times[ch],
                channel_peak,
                n,
                self.peak_hold_samples,
            );
        }

        self.last_peak +=
            smoothing(block_peak, self.last_peak, METER_ATTACK, METER_DECAY) * (block_peak - self.last_peak);
        let block_rms = sqrt(sum_squares / (n * k) as f64);
        self.last_rms += RMS_TIME_CONST * (block_rms - self.last_rms);
        hold(
            &mut self.last_peak_hold,
            &mut self.peak_hold_time,
            block_peak,
            n,
            self.peak_hold_samples,
        );
        Ok(())
    }

    /// Smoothed global peak level.
    pub fn peak(&self) -> f64 {
        self.last_peak
    }

    /// Smoothed global RMS level.
    pub fn rms(&self) -> f64 {
        self.last_rms
    }

    /// Held global peak level.
    pub fn peak_hold(&self) -> f64 {
        self.last_peak_hold
    }

    /// Whether the held peak has reached full scale.
    pub fn over(&self) -> bool {
        self.last_peak_hold >= 1.0
    }

    /// Held peak for one channel.
    pub fn channel_peak_hold(&self, channel: usize) -> f64 {
        self.channel_peak_holds[channel]
    }

    /// Quantizes a channel's smoothed peak onto seven LED levels (0 = dark,
    /// 6 = over).
    pub fn led_state(&self, channel: usize) -> usize {
        let level = self.channel_peaks[channel];
        LED_THRESHOLDS.iter().filter(|&&t| level >= t).count()
    }

    /// Zeroes all meter state.
    pub fn reset(&mut self) {
        self.last_peak = 0.0;
        self.last_rms = 0.0;
        self.last_peak_hold = 0.0;
        self.peak_hold_time = 0;
        self.channel_peaks.fill(0.0);
        self.channel_peak_holds.fill(0.0);
        self.channel_hold_times.fill(0);
    }
}

/// Attack coefficient when the target is above the state, decay otherwise.
fn smoothing(target: f64, state: f64, attack: f64, decay: f64) -> f64 {
    if target > state { attack } else { decay }
}

/// Peak-hold rule: latch a new maximum immediately, otherwise let the held
/// value drop only once the hold time expires.
fn hold(held: &mut f64, elapsed: &mut usize, candidate: f64, block_len: usize, hold_samples: usize) {
    if candidate >= *held || *elapsed >= hold_samples {
        *held = candidate;
        *elapsed = 0;
    } else {
        *elapsed += block_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(amplitude: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * libm::sin(core::f64::consts::TAU * i as f64 / 64.0))
            .collect()
    }

    #[test]
    fn test_peak_settles_on_sine_amplitude() {
        let mut vu = VuBallistics::new(1);
        let block = sine_block(0.5, 512);
        for _ in 0..200 {
            vu.update(&[&block[..]]).unwrap();
        }
        assert!(vu.peak() > 0.49 && vu.peak() < 0.51, "peak {}", vu.peak());
    }

    #[test]
    fn test_rms_settles_near_sine_rms() {
        let mut vu = VuBallistics::new(1);
        let block = sine_block(0.5, 512);
        for _ in 0..200 {
            vu.update(&[&block[..]]).unwrap();
        }
        // 0.5 / sqrt(2) = 0.3536
        assert!(vu.rms() > 0.35 && vu.rms() < 0.36, "rms {}", vu.rms());
    }

    #[test]
    fn test_over_lamp() {
        let mut vu = VuBallistics::new(1);
        vu.update(&[&[1.2, -0.5][..]]).unwrap();
        assert!(vu.over());

        let mut quiet = VuBallistics::new(1);
        quiet.update(&[&[0.5; 64][..]]).unwrap();
        assert!(!quiet.over());
    }

    #[test]
    fn test_peak_hold_expires() {
        let mut vu = VuBallistics::with_hold_samples(1, 100);
        vu.update(&[&[0.9; 64][..]]).unwrap();
        assert!((vu.peak_hold() - 0.9).abs() < 1e-12);

        // Quiet blocks: hold persists until 100 samples have elapsed
        vu.update(&[&[0.0; 64][..]]).unwrap();
        assert!((vu.peak_hold() - 0.9).abs() < 1e-12);
        vu.update(&[&[0.0; 64][..]]).unwrap();
        vu.update(&[&[0.0; 64][..]]).unwrap();
        assert_eq!(vu.peak_hold(), 0.0);
    }

    #[test]
    fn test_led_levels() {
        let mut vu = VuBallistics::new(1);
        assert_eq!(vu.led_state(0), 0);

        vu.update(&[&[0.5; 64][..]]).unwrap();
        assert_eq!(vu.led_state(0), 5);

        vu.update(&[&[1.5; 64][..]]).unwrap();
        assert_eq!(vu.led_state(0), 6);
    }

    #[test]
    fn test_led_decay_monotonic() {
        let mut vu = VuBallistics::new(1);
        vu.update(&[&[0.8; 64][..]]).unwrap();
        let mut previous = vu.led_state(0);
        for _ in 0..50 {
            vu.update(&[&[0.0; 64][..]]).unwrap();
            let current = vu.led_state(0);
            assert!(current <= previous);
            previous = current;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_channel_meters_independent() {
        let mut vu = VuBallistics::new(2);
        let loud = [0.5; 64];
        let soft = [0.005; 64];
        vu.update(&[&loud[..], &soft[..]]).unwrap();
        assert!(vu.led_state(0) > vu.led_state(1));
    }

    #[test]
    fn test_too_many_channels_fails() {
        let mut vu = VuBallistics::new(1);
        let a = [0.0; 4];
        let result = vu.update(&[&a[..], &a[..]]);
        assert!(matches!(result, Err(CoreError::ShapeMismatch(_))));
    }
}
