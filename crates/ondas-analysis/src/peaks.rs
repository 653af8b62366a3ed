//! Spectral peak picking with parabolic refinement.
//!
//! Scans the one-sided bins of a power spectrum with a five-sample sliding
//! window: a bin is a peak when it strictly exceeds its two neighbours on
//! each side. Each peak is refined by fitting a parabola through the three
//! centre values, giving a fractional frequency (cycles per sample) and an
//! interpolated amplitude. Both refinements are linear in the spectrum, so
//! scaling the input scales amplitudes and leaves frequencies untouched.
//!
//! Once a peak is declared its two right neighbours are skipped outright;
//! by the window test they cannot be peaks themselves, which also bounds
//! the peak count at one per three bins.

use crate::spectrum::PowerSpectrum;
use crate::{AnalysisError, Result};

/// One refined spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Bin of the smallest value since the previous peak (the left edge of
    /// this peak's region).
    pub start_bin: usize,
    /// Bin of the local maximum.
    pub peak_bin: usize,
    /// Refined frequency in cycles per sample.
    pub freq: f64,
    /// Interpolated peak amplitude.
    pub amp: f64,
}

/// Reusable peak picker with a fixed capacity.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::{PeakPicker, PowerSpectrum};
///
/// let mut spectrum = PowerSpectrum::new(16, 48000.0);
/// spectrum.set_fft_size(16).unwrap();
/// spectrum.bins_mut().copy_from_slice(&[0.0, 0.0, 0.0, 1.0, 4.0, 8.0, 4.0, 1.0, 0.0]);
///
/// let mut picker = PeakPicker::new(16);
/// let peaks = picker.pick(&spectrum).unwrap();
/// assert_eq!(peaks.len(), 1);
/// assert_eq!(peaks[0].peak_bin, 5);
/// ```
pub struct PeakPicker {
    peaks: Vec<Peak>,
    max_fft_size: usize,
}

impl PeakPicker {
    /// Creates a picker for spectra up to `max_fft_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_fft_size` is 0.
    pub fn new(max_fft_size: usize) -> Self {
        assert!(max_fft_size > 0, "Spectrum capacity must be > 0");

        // One peak per three bins is the densest possible packing
        let capacity = (max_fft_size / 2) / 3 + 1;
        Self {
            peaks: Vec::with_capacity(capacity),
            max_fft_size,
        }
    }

    /// Maximum FFT size in samples.
    pub fn max_fft_size(&self) -> usize {
        self.max_fft_size
    }

    /// The peaks found by the last [`pick`](Self::pick), ascending by bin.
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// The bin where peak `index`'s region ends: the next peak's
    /// `start_bin`, or the Nyquist bin for the last peak.
    pub fn end_bin(&self, index: usize, spectrum: &PowerSpectrum) -> usize {
        self.peaks
            .get(index + 1)
            .map_or(spectrum.fft_size() / 2, |next| next.start_bin)
    }

    /// Scans the one-sided bins of `spectrum` (either layout) and returns
    /// the refined peaks, ascending by bin.
    pub fn pick(&mut self, spectrum: &PowerSpectrum) -> Result<&[Peak]> {
        let n = spectrum.fft_size();
        if n > self.max_fft_size {
            return Err(AnalysisError::CapacityExceeded {
                requested: n,
                maximum: self.max_fft_size,
            });
        }

        let half = n / 2;
        let bins = spectrum.bins();
        let value = |bin: isize| -> f64 {
            if bin < 0 || bin > half as isize {
                0.0
            } else {
                bins[bin as usize]
            }
        };

        self.peaks.clear();
        let mut min_bin = 0;
        let mut min_value = value(0);
        let mut bin = 0usize;
        while bin <= half {
            let b = bin as isize;
            let center = value(b);
            let is_peak = center > value(b - 2)
                && center > value(b - 1)
                && center > value(b + 1)
                && center > value(b + 2);

            if is_peak {
                let (a, c) = (value(b - 1), value(b + 1));
                let p = (a - c) / (2.0 * (a + c - 2.0 * center));
                self.peaks.push(Peak {
                    start_bin: min_bin,
                    peak_bin: bin,
                    freq: (bin as f64 + p) / n as f64,
                    amp: center - (a - c) * p / 4.0,
                });

                // The skipped neighbours still count toward the next
                // region's minimum
                min_value = f64::INFINITY;
                min_bin = bin;
                for skipped in bin + 1..=(bin + 2).min(half) {
                    if value(skipped as isize) < min_value {
                        min_value = value(skipped as isize);
                        min_bin = skipped;
                    }
                }
                bin += 3;
            } else {
                if center < min_value {
                    min_value = center;
                    min_bin = bin;
                }
                bin += 1;
            }
        }
        Ok(&self.peaks)
    }
}
