//! Frame accumulation with fractional hop timing.
//!
//! A [`FrameAccumulator`] absorbs arbitrary-length input blocks and emits
//! fixed-size frames to a caller-supplied closure every time the hop counter
//! crosses the hop size. The hop size is real-valued: when it has a
//! fractional part, the closure receives the sub-sample offset of the frame
//! origin in `[0, 1)` so a processor can compensate (e.g. by rotating phase).
//!
//! Frames always contain the most recent `frame_size` samples; before enough
//! input has arrived they are padded at the front with the stream's pre-roll
//! zeros.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use libm::ceil;

use crate::stream::{IoStream, StreamMode};
use crate::{CoreError, Result};

/// Streams blocks into frames with a real-valued hop.
///
/// # Example
///
/// ```rust
/// use ondas_core::FrameAccumulator;
///
/// let mut acc = FrameAccumulator::new(8, 1);
/// acc.set_params(8, 4.0, true, 0.0).unwrap();
///
/// let mut frames = 0;
/// let block = [1.0; 16];
/// acc.stream_to_frame(&block, |_frame, _offset| frames += 1).unwrap();
/// assert_eq!(frames, 3);
/// ```
pub struct FrameAccumulator {
    stream: IoStream,
    frames: Vec<Vec<f64>>,
    max_frame_size: usize,
    frame_size: usize,
    hop_size: f64,
    hop_counter: f64,
    hop_shift: f64,
    reset_stream: bool,
    reset_hop: bool,
}

impl FrameAccumulator {
    /// Creates an accumulator for frames up to `max_frame_size` samples.
    ///
    /// Starts with `frame_size == hop_size == max_frame_size` (back-to-back
    /// frames).
    ///
    /// # Panics
    ///
    /// Panics if `max_frame_size` is 0 or the channel count is out of range
    /// (see [`crate::MAX_CHANNELS`]).
    pub fn new(max_frame_size: usize, num_channels: usize) -> Self {
        let frames = (0..num_channels)
            .map(|_| {
                let mut frame = Vec::with_capacity(max_frame_size);
                frame.resize(max_frame_size, 0.0);
                frame
            })
            .collect();

        Self {
            stream: IoStream::new(StreamMode::Input, max_frame_size, num_channels),
            frames,
            max_frame_size,
            frame_size: max_frame_size,
            hop_size: max_frame_size as f64,
            hop_counter: 0.0,
            hop_shift: 0.0,
            reset_stream: false,
            reset_hop: false,
        }
    }

    /// Current frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Current hop size in samples (real-valued).
    pub fn hop_size(&self) -> f64 {
        self.hop_size
    }

    /// Sets frame and hop sizes.
    ///
    /// With `immediate` the hop counter is replaced by `hop_offset` and the
    /// input stream is cleared before the next block. Otherwise `hop_offset`
    /// joins the pending shift applied at the next block, so running audio is
    /// re-phased without losing accumulated input.
    ///
    /// Hop sizes below one sample are rejected: the emission loop advances at
    /// least one sample between hop checks.
    pub fn set_params(
        &mut self,
        frame_size: usize,
        hop_size: f64,
        immediate: bool,
        hop_offset: f64,
    ) -> Result<()> {
        if frame_size == 0 || frame_size > self.max_frame_size {
            return Err(CoreError::CapacityExceeded {
                requested: frame_size,
                maximum: self.max_frame_size,
            });
        }
        if hop_size < 1.0 {
            return Err(CoreError::ShapeMismatch("hop size must be >= 1 sample"));
        }

        self.frame_size = frame_size;
        self.hop_size = hop_size;
        for frame in &mut self.frames {
            frame.resize(frame_size, 0.0);
        }
        if immediate {
            self.hop_counter = hop_offset;
            self.reset_stream = true;
        } else {
            self.hop_shift += hop_offset;
        }
        Ok(())
    }

    /// Adds `delta` to the pending hop shift, applied at the next block.
    pub fn offset_hop(&mut self, delta: f64) {
        self.hop_shift += delta;
    }

    /// Schedules a full reset: the stream is cleared and the hop counter
    /// zeroed before the next block is processed.
    pub fn reset(&mut self) {
        self.reset_stream = true;
        self.reset_hop = true;
    }

    /// Streams a single-channel block, invoking `process(frame, offset)` for
    /// each emitted frame. Returns whether any frame was emitted.
    pub fn stream_to_frame<F>(&mut self, input: &[f64], mut process: F) -> Result<bool>
    where
        F: FnMut(&[f64], f64),
    {
        self.stream_to_frames(&[input], |frames, offset| process(&frames[0], offset))
    }

    /// Streams a multichannel block, invoking `process(frames, offset)` for
    /// each emitted frame. `inputs` may carry fewer channels than the
    /// accumulator; the remaining frame buffers keep their previous content.
    /// Returns whether any frame was emitted.
    pub fn stream_to_frames<S, F>(&mut self, inputs: &[S], mut process: F) -> Result<bool>
    where
        S: AsRef<[f64]>,
        F: FnMut(&[Vec<f64>], f64),
    {
        let k = inputs.len();
        if k == 0 || k > self.stream.num_channels() {
            return Err(CoreError::ShapeMismatch("channel count out of range"));
        }
        let n = inputs[0].as_ref().len();
        for input in inputs {
            if input.as_ref().len() != n {
                return Err(CoreError::ShapeMismatch("ragged input block"));
            }
        }

        if self.reset_stream {
            self.stream.reset();
            self.reset_stream = false;
        }
        if self.reset_hop {
            self.hop_counter = 0.0;
            self.reset_hop = false;
        }
        if self.hop_shift != 0.0 {
            self.hop_counter -= self.hop_shift;
            self.hop_shift = 0.0;
        }

        let mut emitted = false;
        let mut done = 0;
        while done < n {
            if self.hop_counter >= self.hop_size {
                self.hop_counter -= self.hop_size;
                // The sub-loop below advances by at most ceil(hop - counter)
                // samples, so the wrapped counter lands in [0, 1); anything
                // else (a parameter change mid-stream) snaps to zero.
                if !(0.0..1.0).contains(&self.hop_counter) {
                    self.hop_counter = 0.0;
                }
                self.stream.read(&mut self.frames[..k], self.frame_size, 0)?;
                let offset = if self.hop_counter > 0.0 {
                    1.0 - self.hop_counter
                } else {
                    0.0
                };
                process(&self.frames[..k], offset);
                emitted = true;
            }

            let until_hop = ceil(self.hop_size - self.hop_counter) as usize;
            let todo = until_hop.max(1).min(n - done);
            self.stream.write(&inputs[..k], todo, done)?;
            self.hop_counter += todo as f64;
            done += todo;
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_hop_frame_count() {
        let mut acc = FrameAccumulator::new(16, 1);
        acc.set_params(16, 8.0, true, 0.0).unwrap();

        let mut count = 0;
        let block = [0.5; 64];
        let emitted = acc
            .stream_to_frame(&block, |frame, offset| {
                count += 1;
                assert_eq!(frame.len(), 16);
                assert_eq!(offset, 0.0);
            })
            .unwrap();
        assert!(emitted);
        // Hops complete at samples 8, 16, ..., 64; the one finishing exactly
        // at the block edge is emitted at the start of the next block.
        assert_eq!(count, 7);
    }

    #[test]
    fn test_frames_contain_latest_samples() {
        let mut acc = FrameAccumulator::new(4, 1);
        acc.set_params(4, 4.0, true, 0.0).unwrap();

        let block: Vec<f64> = (1..=8).map(f64::from).collect();
        let mut frames = Vec::new();
        acc.stream_to_frame(&block, |frame, _| frames.push(frame.to_vec()))
            .unwrap();
        assert_eq!(frames, [[1.0, 2.0, 3.0, 4.0]]);

        // The second frame completes at the start of the next call
        acc.stream_to_frame(&[9.0], |frame, _| frames.push(frame.to_vec()))
            .unwrap();
        assert_eq!(frames[1], [5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_fractional_hop_offsets() {
        let mut acc = FrameAccumulator::new(8, 1);
        acc.set_params(8, 2.5, true, 0.0).unwrap();

        let mut offsets = Vec::new();
        let block = [0.0; 11];
        acc.stream_to_frame(&block, |_, offset| offsets.push(offset))
            .unwrap();

        // Hop completions at 2.5, 5.0, 7.5, 10.0; counters wrap to
        // 0.5, 0.0, 0.5, 0.0 giving offsets 0.5, 0, 0.5, 0
        assert_eq!(offsets.len(), 4);
        assert!((offsets[0] - 0.5).abs() < 1e-12);
        assert!(offsets[1].abs() < 1e-12);
        assert!((offsets[2] - 0.5).abs() < 1e-12);
        assert!(offsets[3].abs() < 1e-12);
    }

    #[test]
    fn test_early_frames_zero_padded() {
        let mut acc = FrameAccumulator::new(8, 1);
        acc.set_params(8, 4.0, true, 0.0).unwrap();

        let mut first = Vec::new();
        acc.stream_to_frame(&[1.0; 5], |frame, _| {
            if first.is_empty() {
                first = frame.to_vec();
            }
        })
        .unwrap();
        // Four samples in, frame is half pre-roll zeros
        assert_eq!(first, [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_multichannel_frames() {
        let mut acc = FrameAccumulator::new(4, 2);
        acc.set_params(4, 4.0, true, 0.0).unwrap();

        let left = [1.0; 4];
        let right = [2.0; 4];
        let mut seen = 0;
        acc.stream_to_frames(&[&left[..], &right[..]], |frames, _| {
            seen += 1;
            assert_eq!(frames[0], [1.0; 4]);
            assert_eq!(frames[1], [2.0; 4]);
        })
        .unwrap();
        // First emission happens once the hop completes on the next call
        acc.stream_to_frames(&[&left[..1], &right[..1]], |frames, _| {
            seen += 1;
            assert_eq!(frames.len(), 2);
        })
        .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_hop_offset_delays_emission() {
        let mut acc = FrameAccumulator::new(8, 1);
        acc.set_params(8, 4.0, true, 0.0).unwrap();
        acc.offset_hop(2.0);

        let mut count = 0;
        // Counter starts at -2 after the shift: hops complete at 6 and 10
        acc.stream_to_frame(&[0.0; 11], |_, _| count += 1).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_oversize_frame_fails() {
        let mut acc = FrameAccumulator::new(8, 1);
        assert!(matches!(
            acc.set_params(16, 4.0, true, 0.0),
            Err(CoreError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_sub_sample_hop_rejected() {
        let mut acc = FrameAccumulator::new(8, 1);
        assert!(matches!(
            acc.set_params(8, 0.5, true, 0.0),
            Err(CoreError::ShapeMismatch(_))
        ));
    }
}
