//! Wavelet-domain denoising of the log power spectrum.
//!
//! A multi-taper log spectrum has a known, frequency-independent noise
//! floor: for `K` tapers the log estimate is biased by `digamma(K)` and has
//! variance `trigamma(K)`. That makes Donoho-Johnstone universal-threshold
//! shrinkage directly applicable: take the log spectrum, remove the bias,
//! wavelet-transform, shrink the detail coefficients against
//! `T = trigamma(K) * sqrt(2 ln(N - 1))`, transform back, exponentiate.
//!
//! Zero-power bins are tolerated: `ln(0) = -inf` flows through the pipeline
//! and comes back out of `exp` as zero.

use crate::dwt::DwtEngine;
use crate::multitaper::MultiTaper;
use crate::spectrum::{PowerSpectrum, SpectrumFormat};
use crate::wavelet::WaveletBank;
use crate::{AnalysisError, Result};

/// Shrinkage rule applied to detail coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShrinkageRule {
    /// Soft: pull every coefficient toward zero by the threshold.
    #[default]
    UniversalSoft,
    /// Mid: soft-like below twice the threshold, identity above, with the
    /// slope doubled so the rule is continuous at `2T`.
    UniversalMid,
    /// Hard: zero below the threshold, identity above.
    UniversalHard,
}

/// Euler-Mascheroni constant.
const EULER_GAMMA: f64 = 0.5772156649015329;

/// Digamma at a positive integer: `psi(n) = -gamma + sum_{k<n} 1/k`.
pub fn digamma(n: usize) -> f64 {
    let harmonic: f64 = (1..n).map(|k| 1.0 / k as f64).sum();
    harmonic - EULER_GAMMA
}

/// Trigamma at a positive integer: `psi1(n) = pi^2/6 - sum_{k<n} 1/k^2`.
pub fn trigamma(n: usize) -> f64 {
    let partial: f64 = (1..n).map(|k| 1.0 / (k * k) as f64).sum();
    std::f64::consts::PI * std::f64::consts::PI / 6.0 - partial
}

/// Multi-taper estimation followed by wavelet shrinkage of the log
/// spectrum.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::{PowerSpectrum, ShrinkageRule, SpectrumDenoiser};
///
/// let mut denoiser = SpectrumDenoiser::new(1024);
/// let mut spectrum = PowerSpectrum::new(1024, 48000.0);
///
/// let frame: Vec<f64> = (0..1024)
///     .map(|i| (std::f64::consts::TAU * 60.0 * i as f64 / 1024.0).sin())
///     .collect();
/// denoiser
///     .process(&mut spectrum, &frame, 8, 1024, 1.0, 0, 5, ShrinkageRule::UniversalSoft)
///     .unwrap();
/// ```
pub struct SpectrumDenoiser {
    multitaper: MultiTaper,
    dwt: DwtEngine,
    bank: WaveletBank,
    full: PowerSpectrum,
    log_power: Vec<f64>,
    max_fft_size: usize,
}

impl SpectrumDenoiser {
    /// Creates a denoiser for FFT sizes up to `max_fft_size`, shrinking in
    /// a Daubechies-4 basis.
    pub fn new(max_fft_size: usize) -> Self {
        Self::with_bank(max_fft_size, WaveletBank::daubechies4())
    }

    /// Creates a denoiser with a caller-chosen wavelet bank.
    ///
    /// # Panics
    ///
    /// Panics if `max_fft_size` is below 4.
    pub fn with_bank(max_fft_size: usize, bank: WaveletBank) -> Self {
        Self {
            multitaper: MultiTaper::new(max_fft_size),
            dwt: DwtEngine::new(max_fft_size),
            bank,
            full: PowerSpectrum::new(max_fft_size, 0.0),
            log_power: vec![0.0; max_fft_size],
            max_fft_size,
        }
    }

    /// Maximum FFT size in samples.
    pub fn max_fft_size(&self) -> usize {
        self.max_fft_size
    }

    /// The wavelet bank used for shrinkage.
    pub fn bank(&self) -> &WaveletBank {
        &self.bank
    }

    /// Estimates and denoises the power spectrum of `input` into `out`.
    ///
    /// The multi-taper stage runs exactly as [`MultiTaper::estimate`] with
    /// the same `(num_tapers, fft_size, scale, adapt_iterations)`; with
    /// `shrink_level == 0` its result is returned untouched. Otherwise the
    /// log spectrum is shrunk over `shrink_level` wavelet levels with the
    /// universal threshold for the clamped taper count, and the symmetric
    /// halves of the denoised spectrum are averaged back into one side.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        out: &mut PowerSpectrum,
        input: &[f64],
        num_tapers: usize,
        fft_size: usize,
        scale: f64,
        adapt_iterations: usize,
        shrink_level: usize,
        rule: ShrinkageRule,
    ) -> Result<()> {
        self.full.set_sample_rate(out.sample_rate());
        self.full.set_format(SpectrumFormat::Full);
        let tapers = self.multitaper.estimate(
            &mut self.full,
            input,
            num_tapers,
            fft_size,
            scale,
            adapt_iterations,
        )?;
        let n = self.full.fft_size();

        if shrink_level == 0 {
            let format = out.format();
            out.copy_from(&self.full)?;
            out.set_format(format);
            return Ok(());
        }

        let detail_start = n.checked_shr(shrink_level as u32).unwrap_or(0);
        if detail_start == 0 {
            return Err(AnalysisError::ShapeMismatch(
                "shrink level exceeds spectrum depth",
            ));
        }

        // Log domain, bias removed
        let bias = digamma(tapers);
        let log_power = &mut self.log_power[..n];
        for (log, &power) in log_power.iter_mut().zip(self.full.bins().iter()) {
            *log = power.ln() - bias;
        }

        self.dwt.forward_in_place(log_power, &self.bank, shrink_level)?;
        let threshold = trigamma(tapers) * (2.0 * ((n - 1) as f64).ln()).sqrt();
        for coeff in &mut log_power[detail_start..] {
            *coeff = shrink(*coeff, threshold, rule);
        }
        self.dwt.inverse_in_place(log_power, &self.bank, shrink_level)?;

        // Exponentiate and average the symmetric halves into one side
        out.set_fft_size(n)?;
        let format = out.format();
        out.set_format(SpectrumFormat::Nyquist);
        for bin in 0..=n / 2 {
            let a = self.log_power[bin].exp();
            let b = self.log_power[(n - bin) % n].exp();
            out.bins_mut()[bin] = 0.5 * (a + b);
        }
        if format == SpectrumFormat::Full {
            out.mirror();
        }
        Ok(())
    }
}

/// Applies one shrinkage rule to a single coefficient.
fn shrink(x: f64, threshold: f64, rule: ShrinkageRule) -> f64 {
    let magnitude = x.abs();
    match rule {
        ShrinkageRule::UniversalSoft => x.signum() * (magnitude - threshold).max(0.0),
        ShrinkageRule::UniversalMid => {
            if magnitude <= threshold {
                0.0
            } else if magnitude <= 2.0 * threshold {
                // Doubled slope keeps the rule continuous at 2T
                x.signum() * 2.0 * (magnitude - threshold)
            } else {
                x
            }
        }
        ShrinkageRule::UniversalHard => {
            if magnitude < threshold { 0.0 } else { x }
        }
    }
}
