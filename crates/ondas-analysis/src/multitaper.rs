//! Multi-taper power spectrum estimation with sinusoidal tapers.
//!
//! The estimator never materialises its tapers. Sinusoidal tapers have the
//! property that the m-th tapered spectrum at bin `b` can be read straight
//! out of a single zero-padded FFT of length `2N`: it is the difference of
//! the padded bins `2b + m` and `2b - m`. The per-taper component is
//! assembled as
//!
//! ```text
//! real = Im[above] - Im[below]
//! imag = Re[above] - Re[below]
//! ```
//!
//! The Re/Im swap is not an error: the sinusoidal taper contributes a
//! factor of `i` (a quarter-turn rotation) relative to the raw padded bins,
//! and swapping the parts applies exactly that rotation before the
//! magnitude is taken. Since the magnitude follows immediately, no sign
//! bookkeeping is needed.
//!
//! Taper `m` is weighted by the parabolic profile `w_m = 1 - ((m-1)/K)^2`,
//! and the accumulated power is normalised by the closed-form weight sum
//! `sum_w = K - ((1/K) - 3 + 2K)/6`.
//!
//! The optional adaptive pass re-estimates the locally optimal taper count
//! per bin from the spectrum's curvature (a five-point second derivative
//! with reflected edges) and re-reads the tapers with the fractional count
//! driving both the weights and the weight sum.

use rustfft::num_complex::Complex;

use ondas_core::{GainCompensation, WindowTable, WindowType};

use crate::fft::{Fft, previous_power_of_two};
use crate::spectrum::{PowerSpectrum, SpectrumFormat};
use crate::{AnalysisError, Result};

/// Hard ceiling on the per-bin taper count in the adaptive pass.
const ADAPTIVE_MAX_TAPERS: usize = 20;

/// Sinusoidal multi-taper power spectrum estimator.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::{MultiTaper, PowerSpectrum};
///
/// let mut estimator = MultiTaper::new(1024);
/// let mut spectrum = PowerSpectrum::new(1024, 48000.0);
///
/// let frame: Vec<f64> = (0..1024)
///     .map(|i| (std::f64::consts::TAU * 100.0 * i as f64 / 1024.0).sin())
///     .collect();
/// estimator
///     .estimate(&mut spectrum, &frame, 4, 1024, 1.0, 0)
///     .unwrap();
/// ```
pub struct MultiTaper {
    fft: Fft,
    max_fft_size: usize,
    spectrum: Vec<Complex<f64>>,
    adaptive: Vec<f64>,
    window: WindowTable,
    windowed: Vec<f64>,
}

impl MultiTaper {
    /// Creates an estimator for FFT sizes up to `max_fft_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_fft_size` is below 4 (the smallest size with a
    /// non-trivial taper count).
    pub fn new(max_fft_size: usize) -> Self {
        assert!(max_fft_size >= 4, "FFT capacity must be >= 4");

        Self {
            fft: Fft::new(2 * max_fft_size),
            max_fft_size,
            spectrum: Vec::with_capacity(2 * max_fft_size),
            // Scratch for the adaptive pass, sized to the configured
            // maximum so refinement works at any FFT size the estimator
            // accepts.
            adaptive: vec![0.0; max_fft_size / 2 + 1],
            window: WindowTable::new(2 * max_fft_size),
            windowed: vec![0.0; 2 * max_fft_size],
        }
    }

    /// Maximum FFT size in samples.
    pub fn max_fft_size(&self) -> usize {
        self.max_fft_size
    }

    /// Estimates the power spectrum of `input` into `out`.
    ///
    /// `fft_size` is rounded **down** to a power of two; pass
    /// `input.len()` for the conventional default. `num_tapers` is clamped
    /// to `1..=N/2 - 1`; the clamped count actually used is returned (the
    /// denoiser needs it for its log-domain bias terms). `scale` is folded
    /// into every bin. With `adapt_iterations > 0` the data-driven
    /// refinement re-estimates a per-bin taper count that many times.
    ///
    /// `out` keeps its layout: Nyquist layouts receive `N/2 + 1` bins, Full
    /// layouts additionally get the mirror half.
    pub fn estimate(
        &mut self,
        out: &mut PowerSpectrum,
        input: &[f64],
        num_tapers: usize,
        fft_size: usize,
        scale: f64,
        adapt_iterations: usize,
    ) -> Result<usize> {
        let n = previous_power_of_two(fft_size);
        if n < 4 {
            return Err(AnalysisError::ShapeMismatch("fft size must be >= 4"));
        }
        if n > self.max_fft_size {
            return Err(AnalysisError::CapacityExceeded {
                requested: n,
                maximum: self.max_fft_size,
            });
        }
        out.set_fft_size(n)?;

        let padded = 2 * n;
        self.fft.resize(padded);
        self.fft.forward_real(input, &mut self.spectrum);

        let tapers = num_tapers.clamp(1, n / 2 - 1);
        let half = n / 2;
        let norm = scale / (padded as f64 * weight_sum(tapers as f64));
        for bin in 0..=half {
            out.bins_mut()[bin] =
                taper_sum(&self.spectrum, bin, tapers, tapers as f64) * norm;
        }

        for _ in 0..adapt_iterations {
            self.refine(out, n, scale);
        }

        if out.format() == SpectrumFormat::Full {
            out.mirror();
        }
        Ok(tapers)
    }

    /// Windows the frame (square-compensated, so total power is preserved)
    /// before estimating. The usual front half of an analysis chain:
    /// window, then multi-taper.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate_windowed(
        &mut self,
        out: &mut PowerSpectrum,
        input: &[f64],
        window: WindowType,
        num_tapers: usize,
        fft_size: usize,
        scale: f64,
        adapt_iterations: usize,
    ) -> Result<usize> {
        if input.len() > self.windowed.len() {
            return Err(AnalysisError::CapacityExceeded {
                requested: input.len(),
                maximum: self.windowed.len(),
            });
        }
        self.window.apply(
            input,
            &mut self.windowed[..input.len()],
            window,
            false,
            1.0,
            GainCompensation::Square,
        )?;
        let windowed = std::mem::take(&mut self.windowed);
        let result = self.estimate(
            out,
            &windowed[..input.len()],
            num_tapers,
            fft_size,
            scale,
            adapt_iterations,
        );
        self.windowed = windowed;
        result
    }

    /// One adaptive pass: curvature-driven per-bin taper counts.
    fn refine(&mut self, out: &mut PowerSpectrum, n: usize, scale: f64) {
        let half = n / 2;
        let max_tapers = (n / 4).min(ADAPTIVE_MAX_TAPERS).max(1);
        self.adaptive[..=half].copy_from_slice(&out.bins()[..=half]);

        // Second derivative on the bin grid; reflect indices at both edges
        let value = |bin: isize| -> f64 {
            let reflected = bin.unsigned_abs();
            let reflected = if reflected > half {
                2 * half - reflected
            } else {
                reflected
            };
            self.adaptive[reflected]
        };
        let n_sq = (n * n) as f64;

        for bin in 0..=half {
            let b = bin as isize;
            let curvature = (-value(b - 2) + 16.0 * value(b - 1) - 30.0 * value(b)
                + 16.0 * value(b + 1)
                - value(b + 2))
                * n_sq
                / 12.0;

            let optimal = if curvature.abs() > 0.0 {
                let k = (12.0 * value(b) * n_sq / curvature.abs()).powf(0.2);
                if k.is_finite() { k } else { max_tapers as f64 }
            } else {
                max_tapers as f64
            };
            let k_frac = optimal.clamp(1.0, max_tapers as f64);
            let k_int = (k_frac as usize).clamp(1, n / 2 - 1);

            let norm = scale / (2.0 * n as f64 * weight_sum(k_frac));
            out.bins_mut()[bin] = taper_sum(&self.spectrum, bin, k_int, k_frac) * norm;
        }
    }
}

/// Weighted taper power at one bin, read from the padded spectrum.
fn taper_sum(spectrum: &[Complex<f64>], bin: usize, tapers: usize, k: f64) -> f64 {
    let padded = spectrum.len();
    let mut power = 0.0;
    for m in 1..=tapers {
        let above = (2 * bin + m) % padded;
        let below = (2 * bin + padded - m) % padded;

        // Quarter-turn rotation of the taper component: parts swapped
        let real = spectrum[above].im - spectrum[below].im;
        let imag = spectrum[above].re - spectrum[below].re;

        let ratio = (m - 1) as f64 / k;
        power += (real * real + imag * imag) * (1.0 - ratio * ratio);
    }
    power
}

/// Closed form of `sum_{m=1..K} (1 - ((m-1)/K)^2)`, valid for fractional K.
fn weight_sum(k: f64) -> f64 {
    k - ((1.0 / k) - 3.0 + 2.0 * k) / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn sine(freq_bins: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (TAU * freq_bins * i as f64 / n as f64).sin()).collect()
    }

    fn peak_bin(spectrum: &PowerSpectrum) -> usize {
        let half = spectrum.fft_size() / 2;
        (0..=half)
            .max_by(|&a, &b| spectrum.bins()[a].partial_cmp(&spectrum.bins()[b]).unwrap())
            .unwrap()
    }

    #[test]
    fn test_weight_sum_matches_series() {
        for k in 1..=16 {
            let direct: f64 = (1..=k)
                .map(|m| 1.0 - ((m - 1) as f64 / k as f64).powi(2))
                .sum();
            assert!((weight_sum(k as f64) - direct).abs() < 1e-12, "K = {k}");
        }
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let n = 512;
        let mut estimator = MultiTaper::new(n);
        let mut spectrum = PowerSpectrum::new(n, 48000.0);

        let signal = sine(37.0, n);
        let used = estimator
            .estimate(&mut spectrum, &signal, 6, n, 1.0, 0)
            .unwrap();
        assert_eq!(used, 6);
        assert_eq!(peak_bin(&spectrum), 37);
    }

    #[test]
    fn test_power_nonnegative() {
        let n = 256;
        let mut estimator = MultiTaper::new(n);
        let mut spectrum = PowerSpectrum::new(n, 48000.0);

        let mut state = 0x9E3779B97F4A7C15u64;
        let noise: Vec<f64> = (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect();
        estimator.estimate(&mut spectrum, &noise, 8, n, 1.0, 0).unwrap();
        assert!(spectrum.bins().iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_scale_is_linear() {
        let n = 128;
        let mut estimator = MultiTaper::new(n);
        let signal = sine(9.0, n);

        let mut unit = PowerSpectrum::new(n, 48000.0);
        let mut doubled = PowerSpectrum::new(n, 48000.0);
        estimator.estimate(&mut unit, &signal, 4, n, 1.0, 0).unwrap();
        estimator.estimate(&mut doubled, &signal, 4, n, 2.0, 0).unwrap();

        for (a, b) in unit.bins().iter().zip(doubled.bins().iter()) {
            assert!((2.0 * a - b).abs() < 1e-12 * (1.0 + a.abs()));
        }
    }

    #[test]
    fn test_taper_count_clamped() {
        let n = 16;
        let mut estimator = MultiTaper::new(64);
        let mut spectrum = PowerSpectrum::new(64, 48000.0);
        let used = estimator
            .estimate(&mut spectrum, &sine(3.0, n), 100, n, 1.0, 0)
            .unwrap();
        assert_eq!(used, n / 2 - 1);
    }

    #[test]
    fn test_fft_size_rounds_down() {
        let mut estimator = MultiTaper::new(256);
        let mut spectrum = PowerSpectrum::new(256, 48000.0);
        estimator
            .estimate(&mut spectrum, &sine(5.0, 100), 4, 100, 1.0, 0)
            .unwrap();
        assert_eq!(spectrum.fft_size(), 64);
    }

    #[test]
    fn test_capacity_failure_propagates() {
        let mut estimator = MultiTaper::new(1024);
        // Spectrum carrier smaller than the requested size: the estimate
        // must fail, not truncate
        let mut spectrum = PowerSpectrum::new(128, 48000.0);
        let result = estimator.estimate(&mut spectrum, &sine(5.0, 512), 4, 512, 1.0, 0);
        assert!(matches!(result, Err(AnalysisError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_full_layout_mirrors() {
        let n = 64;
        let mut estimator = MultiTaper::new(n);
        let mut spectrum = PowerSpectrum::new(n, 48000.0);
        spectrum.set_format(SpectrumFormat::Full);

        estimator.estimate(&mut spectrum, &sine(7.0, n), 4, n, 1.0, 0).unwrap();
        let bins = spectrum.bins();
        for bin in 1..n / 2 {
            assert_eq!(bins[bin], bins[n - bin]);
        }
    }

    #[test]
    fn test_adaptive_keeps_peak_and_positivity() {
        let n = 256;
        let mut estimator = MultiTaper::new(n);
        let mut plain = PowerSpectrum::new(n, 48000.0);
        let mut refined = PowerSpectrum::new(n, 48000.0);

        let signal = sine(19.0, n);
        estimator.estimate(&mut plain, &signal, 6, n, 1.0, 0).unwrap();
        estimator.estimate(&mut refined, &signal, 6, n, 1.0, 2).unwrap();

        assert_eq!(peak_bin(&refined), peak_bin(&plain));
        assert!(refined.bins().iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_shift_invariance_for_stationary_input() {
        // Spectra of x[n] and x[n - delta] should agree up to edge effects
        let n = 256;
        let tapers = 8;
        let mut estimator = MultiTaper::new(n);

        let long = sine(19.0, 2 * n);
        let mut a = PowerSpectrum::new(n, 48000.0);
        let mut b = PowerSpectrum::new(n, 48000.0);
        estimator.estimate(&mut a, &long[..n], tapers, n, 1.0, 0).unwrap();
        estimator.estimate(&mut b, &long[16..16 + n], tapers, n, 1.0, 0).unwrap();

        let peak = a.bins()[peak_bin(&a)];
        let tolerance = peak / tapers as f64;
        for (&pa, &pb) in a.bins().iter().zip(b.bins().iter()) {
            assert!((pa - pb).abs() < tolerance, "{pa} vs {pb}");
        }
    }

    #[test]
    fn test_windowed_estimate_runs() {
        let n = 256;
        let mut estimator = MultiTaper::new(n);
        let mut spectrum = PowerSpectrum::new(n, 48000.0);
        let signal = sine(19.0, n);

        estimator
            .estimate_windowed(
                &mut spectrum,
                &signal,
                ondas_core::WindowType::Hann,
                4,
                n,
                1.0,
                0,
            )
            .unwrap();
        assert_eq!(peak_bin(&spectrum), 19);
    }
}
