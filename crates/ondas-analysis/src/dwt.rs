//! Periodic discrete wavelet transform.
//!
//! Critically sampled, periodic (wrap-around) DWT driven by a
//! [`WaveletBank`]. The forward transform is a correlation against the
//! stored (reversed) analysis filters; each level halves the working length,
//! leaving detail coefficients in place and decomposing only the
//! approximation half. The inverse rebuilds from the smallest scale up.
//!
//! A single scratch buffer of `max_size` samples makes the in-place
//! variants possible; the out-of-place variants are a copy followed by the
//! in-place pass, so input and output never alias in user code.

use crate::wavelet::WaveletBank;
use crate::{AnalysisError, Result};

/// Forward/inverse multi-level periodic DWT engine.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::{DwtEngine, WaveletBank};
///
/// let bank = WaveletBank::haar();
/// let mut dwt = DwtEngine::new(64);
///
/// let mut data: Vec<f64> = (0..8).map(f64::from).collect();
/// let original = data.clone();
///
/// dwt.forward_in_place(&mut data, &bank, 3).unwrap();
/// dwt.inverse_in_place(&mut data, &bank, 3).unwrap();
/// for (a, b) in data.iter().zip(original.iter()) {
///     assert!((a - b).abs() < 1e-12);
/// }
/// ```
pub struct DwtEngine {
    max_size: usize,
    scratch: Vec<f64>,
}

impl DwtEngine {
    /// Creates an engine for transforms up to `max_size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "Transform capacity must be > 0");

        Self {
            max_size,
            scratch: vec![0.0; max_size],
        }
    }

    /// Maximum transform size in samples.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Forward transform of `input` into `output` over `levels` levels.
    ///
    /// A failing call writes nothing to `output`.
    pub fn forward(
        &mut self,
        input: &[f64],
        output: &mut [f64],
        bank: &WaveletBank,
        levels: usize,
    ) -> Result<()> {
        if input.len() != output.len() {
            return Err(AnalysisError::ShapeMismatch("input/output length differ"));
        }
        self.validate(input.len(), bank.analysis_low().len(), levels)?;
        output.copy_from_slice(input);
        self.forward_levels(output, bank, levels);
        Ok(())
    }

    /// Inverse transform of `input` into `output` over `levels` levels.
    ///
    /// A failing call writes nothing to `output`.
    pub fn inverse(
        &mut self,
        input: &[f64],
        output: &mut [f64],
        bank: &WaveletBank,
        levels: usize,
    ) -> Result<()> {
        if input.len() != output.len() {
            return Err(AnalysisError::ShapeMismatch("input/output length differ"));
        }
        self.validate(input.len(), bank.synthesis_low().len(), levels)?;
        output.copy_from_slice(input);
        self.inverse_levels(output, bank, levels);
        Ok(())
    }

    /// Forward transform of `buffer` in place.
    ///
    /// Level `l` transforms the first `n / 2^l` samples: low-pass outputs
    /// land in the lower half of that span, high-pass in the upper half.
    /// A failing call leaves `buffer` untouched.
    pub fn forward_in_place(
        &mut self,
        buffer: &mut [f64],
        bank: &WaveletBank,
        levels: usize,
    ) -> Result<()> {
        self.validate(buffer.len(), bank.analysis_low().len(), levels)?;
        self.forward_levels(buffer, bank, levels);
        Ok(())
    }

    /// Inverse transform of `buffer` in place, smallest scale first.
    /// A failing call leaves `buffer` untouched.
    pub fn inverse_in_place(
        &mut self,
        buffer: &mut [f64],
        bank: &WaveletBank,
        levels: usize,
    ) -> Result<()> {
        self.validate(buffer.len(), bank.synthesis_low().len(), levels)?;
        self.inverse_levels(buffer, bank, levels);
        Ok(())
    }

    fn forward_levels(&mut self, buffer: &mut [f64], bank: &WaveletBank, levels: usize) {
        let n = buffer.len();
        for level in 0..levels {
            let len = n >> level;
            self.scratch[..len].copy_from_slice(&buffer[..len]);
            forward_level(
                &self.scratch[..len],
                &mut buffer[..len],
                bank.analysis_low(),
                bank.analysis_high(),
                bank.analysis_offset(),
            );
        }
    }

    fn inverse_levels(&mut self, buffer: &mut [f64], bank: &WaveletBank, levels: usize) {
        let n = buffer.len();
        for level in (0..levels).rev() {
            let len = n >> level;
            self.scratch[..len].copy_from_slice(&buffer[..len]);
            inverse_level(
                &self.scratch[..len],
                &mut buffer[..len],
                bank.synthesis_low(),
                bank.synthesis_high(),
                bank.synthesis_offset(),
            );
        }
    }

    /// Checks every level up front so a failing transform writes nothing.
    fn validate(&self, n: usize, filter_len: usize, levels: usize) -> Result<()> {
        if n > self.max_size {
            return Err(AnalysisError::CapacityExceeded {
                requested: n,
                maximum: self.max_size,
            });
        }
        if n == 0 && levels == 0 {
            return Ok(());
        }
        for level in 0..levels {
            let len = n >> level;
            if len < 2 || len % 2 != 0 {
                return Err(AnalysisError::ShapeMismatch(
                    "working length must stay even across levels",
                ));
            }
            if filter_len > len {
                return Err(AnalysisError::ShapeMismatch(
                    "filter longer than working length",
                ));
            }
        }
        Ok(())
    }
}

/// One forward level: correlate against both filters on the even grid.
fn forward_level(input: &[f64], output: &mut [f64], low: &[f64], high: &[f64], offset: isize) {
    let len = input.len();
    let half = len / 2;

    for i in 0..half {
        let start = (2 * i as isize + offset).rem_euclid(len as isize) as usize;
        let mut lo = 0.0;
        let mut hi = 0.0;
        for (j, (&l, &h)) in low.iter().zip(high.iter()).enumerate() {
            let sample = input[(start + j) % len];
            lo += l * sample;
            hi += h * sample;
        }
        output[i] = lo;
        output[half + i] = hi;
    }
}

/// One inverse level: scatter-accumulate both halves back onto the grid.
fn inverse_level(input: &[f64], output: &mut [f64], low: &[f64], high: &[f64], offset: isize) {
    let len = input.len();
    let half = len / 2;

    output[..len].fill(0.0);
    for i in 0..half {
        let start = (2 * i as isize + offset).rem_euclid(len as isize) as usize;
        let approx = input[i];
        let detail = input[half + i];
        for (j, (&l, &h)) in low.iter().zip(high.iter()).enumerate() {
            output[(start + j) % len] += l * approx + h * detail;
        }
    }
}
