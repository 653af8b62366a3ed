//! Whole-frame delay line.
//!
//! A [`FrameDelay`] delays audio in quanta of one frame rather than one
//! sample. Storage is `channels x (max_frames + 1) x max_frame_size`; the
//! spare slot is what allows a zero-frame delay with shared input/output
//! buffers: the incoming frame is stored first and read back from the same
//! slot.
//!
//! Until `frames_delay` frames have been stored the output is silence.
//! Changing the frame size (or calling [`FrameDelay::clear`]) restarts the
//! line empty.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::stream::MAX_CHANNELS;
use crate::{CoreError, Result};

/// Per-frame circular delay across channels.
///
/// # Example
///
/// ```rust
/// use ondas_core::FrameDelay;
///
/// let mut delay = FrameDelay::new(4, 64, 1);
/// let frame = [1.0; 64];
/// let mut out = [0.0; 64];
///
/// // One frame of delay: silence first, then the stored frame
/// delay.process(&[&frame[..]], &mut [&mut out[..]], 64, 1).unwrap();
/// assert!(out.iter().all(|&x| x == 0.0));
/// delay.process(&[&frame[..]], &mut [&mut out[..]], 64, 1).unwrap();
/// assert!(out.iter().all(|&x| x == 1.0));
/// ```
pub struct FrameDelay {
    slots: Vec<Vec<f64>>,
    max_frames: usize,
    max_frame_size: usize,
    write_cursor: usize,
    valid_frames: usize,
    frame_size: usize,
    pending_clear: bool,
}

impl FrameDelay {
    /// Creates a delay line holding up to `max_frames` whole frames of up to
    /// `max_frame_size` samples per channel.
    ///
    /// # Panics
    ///
    /// Panics if any dimension is 0 or the channel count exceeds
    /// [`MAX_CHANNELS`].
    pub fn new(max_frames: usize, max_frame_size: usize, num_channels: usize) -> Self {
        assert!(max_frames > 0, "Frame count must be > 0");
        assert!(max_frame_size > 0, "Frame capacity must be > 0");
        assert!(
            num_channels > 0 && num_channels <= MAX_CHANNELS,
            "Channel count out of range"
        );

        let slot_samples = (max_frames + 1) * max_frame_size;
        Self {
            slots: (0..num_channels).map(|_| vec![0.0; slot_samples]).collect(),
            max_frames,
            max_frame_size,
            write_cursor: 0,
            valid_frames: 0,
            frame_size: 0,
            pending_clear: true,
        }
    }

    /// Maximum delay in frames.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Schedules a restart: the next call stores into an empty line.
    pub fn clear(&mut self) {
        self.pending_clear = true;
    }

    /// Stores one frame per channel and reads back the frame stored
    /// `frames_delay` calls earlier (silence if not yet available).
    pub fn process<S, D>(
        &mut self,
        inputs: &[S],
        outputs: &mut [D],
        frame_size: usize,
        frames_delay: usize,
    ) -> Result<()>
    where
        S: AsRef<[f64]>,
        D: AsMut<[f64]>,
    {
        self.check(inputs.len(), frame_size, frames_delay)?;
        if outputs.len() != inputs.len() {
            return Err(CoreError::ShapeMismatch("channel count out of range"));
        }
        self.restart_if_needed(frame_size);

        let (write_off, read) = self.cursors(frames_delay);
        for (channel, (input, output)) in self
            .slots
            .iter_mut()
            .zip(inputs.iter().zip(outputs.iter_mut()))
        {
            channel[write_off..write_off + frame_size]
                .copy_from_slice(&input.as_ref()[..frame_size]);
            match read {
                Some(read_off) => output.as_mut()[..frame_size]
                    .copy_from_slice(&channel[read_off..read_off + frame_size]),
                None => output.as_mut()[..frame_size].fill(0.0),
            }
        }
        self.advance();
        Ok(())
    }

    /// In-place variant: each buffer is stored, then overwritten with the
    /// delayed frame. With `frames_delay == 0` this passes audio through
    /// unchanged.
    pub fn process_in_place<D>(
        &mut self,
        buffers: &mut [D],
        frame_size: usize,
        frames_delay: usize,
    ) -> Result<()>
    where
        D: AsMut<[f64]>,
    {
        self.check(buffers.len(), frame_size, frames_delay)?;
        self.restart_if_needed(frame_size);

        let (write_off, read) = self.cursors(frames_delay);
        for (channel, buffer) in self.slots.iter_mut().zip(buffers.iter_mut()) {
            let buffer = &mut buffer.as_mut()[..frame_size];
            channel[write_off..write_off + frame_size].copy_from_slice(buffer);
            match read {
                Some(read_off) => {
                    buffer.copy_from_slice(&channel[read_off..read_off + frame_size]);
                }
                None => buffer.fill(0.0),
            }
        }
        self.advance();
        Ok(())
    }

    fn check(&self, num_buffers: usize, frame_size: usize, frames_delay: usize) -> Result<()> {
        if frame_size == 0 || frame_size > self.max_frame_size {
            return Err(CoreError::CapacityExceeded {
                requested: frame_size,
                maximum: self.max_frame_size,
            });
        }
        if num_buffers == 0 || num_buffers > self.slots.len() {
            return Err(CoreError::ShapeMismatch("channel count out of range"));
        }
        if frames_delay > self.max_frames {
            return Err(CoreError::ShapeMismatch("delay exceeds frame capacity"));
        }
        Ok(())
    }

    fn restart_if_needed(&mut self, frame_size: usize) {
        if self.pending_clear || frame_size != self.frame_size {
            self.frame_size = frame_size;
            self.write_cursor = 0;
            self.valid_frames = 0;
            self.pending_clear = false;
        }
    }

    /// Sample offsets for the write slot and (if enough frames are stored)
    /// the read slot.
    fn cursors(&self, frames_delay: usize) -> (usize, Option<usize>) {
        let slot_count = self.max_frames + 1;
        let write_off = self.write_cursor * self.max_frame_size;
        let read = (frames_delay <= self.valid_frames).then(|| {
            let slot = (self.write_cursor + slot_count - frames_delay) % slot_count;
            slot * self.max_frame_size
        });
        (write_off, read)
    }

    fn advance(&mut self) {
        let slot_count = self.max_frames + 1;
        self.write_cursor = (self.write_cursor + 1) % slot_count;
        self.valid_frames = (self.valid_frames + 1).min(slot_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f64, size: usize) -> Vec<f64> {
        vec![value; size]
    }

    #[test]
    fn test_delay_reproduces_earlier_frame() {
        let mut delay = FrameDelay::new(4, 8, 1);
        let mut out = [0.0; 8];

        for step in 0..6 {
            let input = frame(step as f64 + 1.0, 8);
            delay
                .process(&[&input[..]], &mut [&mut out[..]], 8, 2)
                .unwrap();
            if step < 2 {
                assert!(out.iter().all(|&x| x == 0.0), "expected silence at {step}");
            } else {
                let expected = (step - 2) as f64 + 1.0;
                assert!(out.iter().all(|&x| x == expected), "step {step}");
            }
        }
    }

    #[test]
    fn test_zero_delay_in_place_passthrough() {
        let mut delay = FrameDelay::new(1, 4, 1);
        let mut buffer = [1.0, 2.0, 3.0, 4.0];
        delay.process_in_place(&mut [&mut buffer[..]], 4, 0).unwrap();
        assert_eq!(buffer, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_max_delay_uses_spare_slot() {
        let mut delay = FrameDelay::new(2, 4, 1);
        let mut out = [0.0; 4];

        for step in 0..5 {
            let input = frame(step as f64, 4);
            delay
                .process(&[&input[..]], &mut [&mut out[..]], 4, 2)
                .unwrap();
        }
        // Step 4 reads the frame from step 2
        assert!(out.iter().all(|&x| x == 2.0));
    }

    #[test]
    fn test_frame_size_change_restarts() {
        let mut delay = FrameDelay::new(4, 8, 1);
        let mut out = [0.0; 8];

        let input = frame(5.0, 8);
        delay
            .process(&[&input[..]], &mut [&mut out[..]], 8, 1)
            .unwrap();
        delay
            .process(&[&input[..]], &mut [&mut out[..]], 8, 1)
            .unwrap();
        assert!(out.iter().all(|&x| x == 5.0));

        // Shrinking the frame size empties the line
        let small = frame(7.0, 4);
        let mut small_out = [9.0; 4];
        delay
            .process(&[&small[..]], &mut [&mut small_out[..]], 4, 1)
            .unwrap();
        assert!(small_out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_clear_restarts() {
        let mut delay = FrameDelay::new(4, 8, 1);
        let mut out = [0.0; 8];
        let input = frame(3.0, 8);

        delay
            .process(&[&input[..]], &mut [&mut out[..]], 8, 1)
            .unwrap();
        delay.clear();
        delay
            .process(&[&input[..]], &mut [&mut out[..]], 8, 1)
            .unwrap();
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_multichannel_frames_kept_separate() {
        let mut delay = FrameDelay::new(2, 4, 2);
        let left = frame(1.0, 4);
        let right = frame(-1.0, 4);
        let mut out_l = [0.0; 4];
        let mut out_r = [0.0; 4];

        for _ in 0..3 {
            delay
                .process(
                    &[&left[..], &right[..]],
                    &mut [&mut out_l[..], &mut out_r[..]],
                    4,
                    1,
                )
                .unwrap();
        }
        assert!(out_l.iter().all(|&x| x == 1.0));
        assert!(out_r.iter().all(|&x| x == -1.0));
    }

    #[test]
    fn test_shape_errors() {
        let mut delay = FrameDelay::new(2, 4, 1);
        let input = frame(0.0, 8);
        let mut out = [0.0; 8];
        assert!(matches!(
            delay.process(&[&input[..]], &mut [&mut out[..]], 8, 0),
            Err(CoreError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            delay.process(&[&input[..4]], &mut [&mut out[..4]], 4, 3),
            Err(CoreError::ShapeMismatch(_))
        ));
    }
}
