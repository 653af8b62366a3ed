//! Overlap-add frame processing engine.
//!
//! An [`OverlapAdd`] splits a continuous stream into frames of size `F`
//! every `H` samples (`H <= F`), hands each frame to a caller-supplied
//! closure for in-place processing, and reconstructs the output by
//! overlap-adding the processed frames. With an identity processor, a
//! constant-one window, and `H == F` the engine is a pure `F`-sample delay.
//!
//! Per channel the engine keeps three preallocated buffers:
//!
//! - a doubled input ring (`2F`): every sample is written at both `p` and
//!   `p + F`, so the most recent `F` samples are always contiguous starting
//!   at `p` and frame extraction is a straight `copy_from_slice`;
//! - an output ring (`F`) holding partially accumulated frames;
//! - a frame scratch buffer (`F`) handed to the processor.
//!
//! The overlap-add write is split into an overlapping region of `F - H`
//! samples (accumulate) and a tail region of `H` samples (overwrite); the
//! overwrite replaces already-consumed ring content, so the ring never needs
//! zeroing mid-stream.
//!
//! Parameter changes are latched and applied only at a hop boundary, so a
//! frame is never torn.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::stream::MAX_CHANNELS;
use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy)]
struct PendingParams {
    frame_size: usize,
    hop_size: usize,
    hop_offset: usize,
}

/// Block-to-frame engine with overlap-add reconstruction.
///
/// # Example
///
/// ```rust
/// use ondas_core::OverlapAdd;
///
/// let mut ola = OverlapAdd::new(256, 1);
/// ola.set_params(256, 256, 0).unwrap();
///
/// let input = [1.0; 512];
/// let mut output = [0.0; 512];
/// ola.process_block(&input, &mut output, |frame| {
///     for sample in frame.iter_mut() {
///         *sample *= 0.5;
///     }
/// })
/// .unwrap();
/// ```
pub struct OverlapAdd {
    input_rings: Vec<Vec<f64>>,
    output_rings: Vec<Vec<f64>>,
    frames: Vec<Vec<f64>>,
    max_frame_size: usize,
    frame_size: usize,
    hop_size: usize,
    io_pointer: usize,
    hop_pointer: usize,
    pending: Option<PendingParams>,
    reset: bool,
}

impl OverlapAdd {
    /// Creates an engine for frames up to `max_frame_size` samples.
    ///
    /// Starts with `frame_size == hop_size == max_frame_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_frame_size` is 0 or the channel count is 0 or exceeds
    /// [`MAX_CHANNELS`].
    pub fn new(max_frame_size: usize, num_channels: usize) -> Self {
        assert!(max_frame_size > 0, "Frame capacity must be > 0");
        assert!(
            num_channels > 0 && num_channels <= MAX_CHANNELS,
            "Channel count out of range"
        );

        Self {
            input_rings: (0..num_channels)
                .map(|_| vec![0.0; 2 * max_frame_size])
                .collect(),
            output_rings: (0..num_channels).map(|_| vec![0.0; max_frame_size]).collect(),
            frames: (0..num_channels).map(|_| vec![0.0; max_frame_size]).collect(),
            max_frame_size,
            frame_size: max_frame_size,
            hop_size: max_frame_size,
            io_pointer: 0,
            hop_pointer: 0,
            pending: None,
            reset: false,
        }
    }

    /// Current frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Current hop size in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Latches a parameter change to be applied at the next hop boundary.
    ///
    /// `hop_offset` phases the new hop counter and must be smaller than
    /// `hop_size`. Requires `1 <= hop_size <= frame_size <= max_frame_size`.
    pub fn set_params(&mut self, frame_size: usize, hop_size: usize, hop_offset: usize) -> Result<()> {
        if frame_size == 0 || frame_size > self.max_frame_size {
            return Err(CoreError::CapacityExceeded {
                requested: frame_size,
                maximum: self.max_frame_size,
            });
        }
        if hop_size == 0 || hop_size > frame_size {
            return Err(CoreError::ShapeMismatch("hop size must be in 1..=frame size"));
        }
        if hop_offset >= hop_size {
            return Err(CoreError::ShapeMismatch("hop offset must be below hop size"));
        }

        self.pending = Some(PendingParams {
            frame_size,
            hop_size,
            hop_offset,
        });
        Ok(())
    }

    /// Schedules a reset: rings are cleared and pointers rewound at the next
    /// hop boundary.
    pub fn reset(&mut self) {
        self.reset = true;
    }

    /// Processes a single-channel block. Returns whether any frame was
    /// processed.
    pub fn process_block<F>(&mut self, input: &[f64], output: &mut [f64], mut process: F) -> Result<bool>
    where
        F: FnMut(&mut [f64]),
    {
        self.process_blocks(&[input], &mut [output], |frames| process(&mut frames[0]))
    }

    /// Processes a multichannel block: `inputs` and `outputs` must have the
    /// same channel count and per-channel length. The closure receives all
    /// channel frames at once so cross-channel processors (e.g. mid/side)
    /// see a coherent frame set. Returns whether any frame was processed.
    pub fn process_blocks<S, D, F>(
        &mut self,
        inputs: &[S],
        outputs: &mut [D],
        mut process: F,
    ) -> Result<bool>
    where
        S: AsRef<[f64]>,
        D: AsMut<[f64]>,
        F: FnMut(&mut [Vec<f64>]),
    {
        let k = inputs.len();
        if k == 0 || k > self.input_rings.len() || k != outputs.len() {
            return Err(CoreError::ShapeMismatch("channel count out of range"));
        }
        let n = inputs[0].as_ref().len();
        for input in inputs {
            if input.as_ref().len() != n {
                return Err(CoreError::ShapeMismatch("ragged input block"));
            }
        }
        for output in outputs.iter_mut() {
            if output.as_mut().len() != n {
                return Err(CoreError::ShapeMismatch("ragged output block"));
            }
        }

        let mut processed = false;
        let mut done = 0;
        while done < n {
            if self.hop_pointer >= self.hop_size {
                if self.reset || self.pending.is_some() {
                    self.apply_pending();
                } else {
                    self.run_frame(k, &mut process);
                    self.hop_pointer -= self.hop_size;
                    processed = true;
                }
            }

            let loop_size = (self.hop_size - self.hop_pointer)
                .min(self.frame_size - self.io_pointer)
                .min(n - done);
            for ch in 0..k {
                let input = &inputs[ch].as_ref()[done..done + loop_size];
                let output = &mut outputs[ch].as_mut()[done..done + loop_size];
                let ring = &mut self.input_rings[ch];
                let out_ring = &self.output_rings[ch];
                for (t, (&sample, out)) in input.iter().zip(output.iter_mut()).enumerate() {
                    let p = self.io_pointer + t;
                    ring[p] = sample;
                    ring[p + self.frame_size] = sample;
                    *out = out_ring[p];
                }
            }
            self.io_pointer += loop_size;
            if self.io_pointer == self.frame_size {
                self.io_pointer = 0;
            }
            self.hop_pointer += loop_size;
            done += loop_size;
        }
        Ok(processed)
    }

    /// Extracts, processes, and overlap-adds one frame for `k` channels.
    fn run_frame<F>(&mut self, k: usize, process: &mut F)
    where
        F: FnMut(&mut [Vec<f64>]),
    {
        let frame_size = self.frame_size;
        let hop_size = self.hop_size;
        let p = self.io_pointer;

        for ch in 0..k {
            self.frames[ch][..frame_size]
                .copy_from_slice(&self.input_rings[ch][p..p + frame_size]);
        }
        process(&mut self.frames[..k]);

        let overlap = frame_size - hop_size;
        for ch in 0..k {
            let frame = &self.frames[ch];
            let out_ring = &mut self.output_rings[ch][..frame_size];
            ring_add(out_ring, p, &frame[..overlap]);
            ring_copy(out_ring, (p + overlap) % frame_size, &frame[overlap..frame_size]);
        }
    }

    /// Applies a latched parameter change or reset at a hop boundary.
    fn apply_pending(&mut self) {
        let resize = self
            .pending
            .is_some_and(|params| params.frame_size != self.frame_size);
        if self.reset || resize {
            for ring in &mut self.input_rings {
                ring.fill(0.0);
            }
            for ring in &mut self.output_rings {
                ring.fill(0.0);
            }
            self.io_pointer = 0;
        }
        self.reset = false;

        if let Some(params) = self.pending.take() {
            self.frame_size = params.frame_size;
            self.hop_size = params.hop_size;
            self.hop_pointer = params.hop_offset;
            for frame in &mut self.frames {
                frame.resize(params.frame_size, 0.0);
            }
        } else {
            self.hop_pointer = 0;
        }
    }
}

/// Accumulates `src` into the ring starting at `start`, wrapping once at most.
fn ring_add(ring: &mut [f64], start: usize, src: &[f64]) {
    let first = (ring.len() - start).min(src.len());
    for (dst, s) in ring[start..start + first].iter_mut().zip(&src[..first]) {
        *dst += *s;
    }
    for (dst, s) in ring[..src.len() - first].iter_mut().zip(&src[first..]) {
        *dst += *s;
    }
}

/// Copies `src` into the ring starting at `start`, wrapping once at most.
fn ring_copy(ring: &mut [f64], start: usize, src: &[f64]) {
    let first = (ring.len() - start).min(src.len());
    ring[start..start + first].copy_from_slice(&src[..first]);
    ring[..src.len() - first].copy_from_slice(&src[first..]);
}
