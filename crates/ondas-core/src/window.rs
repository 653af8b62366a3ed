//! Analysis windows with cached coefficients and gain compensation.
//!
//! A [`WindowTable`] precomputes window coefficients up to a fixed maximum
//! size and reuses them until the `(size, type, sqrt)` triple changes. Both
//! the linear and squared coefficient means are cached alongside, so gain
//! compensation is a single multiply at apply time.
//!
//! All window formulas use the periodic normalisation `i / N`, not
//! `i / (N - 1)`, which keeps them exactly invertible under overlap-add at
//! power-of-two hop ratios.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::{cos, fabs, sin, sqrt};

use crate::{CoreError, Result};

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    /// Rectangular (no windowing)
    Rect,
    /// Hann window (raised cosine)
    Hann,
    /// Hamming window
    Hamming,
    /// Kaiser window with alpha = 6.8
    Kaiser,
    /// Triangular window
    Triangle,
    /// Cosine (half-sine) window
    Cosine,
    /// Exact Blackman window
    Blackman,
    /// 3-term Blackman, -62 dB sidelobes
    Blackman62,
    /// 3-term Blackman, -70 dB sidelobes
    Blackman70,
    /// 4-term Blackman, -74 dB sidelobes
    Blackman74,
    /// 4-term Blackman, -92 dB sidelobes
    Blackman92,
    /// Minimum 4-term Blackman-Harris window
    BlackmanHarris,
    /// Flat-top window (amplitude-accurate peak measurement)
    FlatTop,
}

/// Gain compensation applied after windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GainCompensation {
    /// No compensation
    #[default]
    None,
    /// Divide by the mean window value
    Linear,
    /// Divide by the mean squared window value
    Square,
    /// Divide by mean(window^2) / mean(window)
    SquareOverLinear,
}

/// Kaiser shape parameter. Fixed rather than user-facing: 6.8 puts the first
/// sidelobe near -70 dB, comparable to Blackman70.
const KAISER_ALPHA: f64 = 6.8;

/// Window table with cached coefficients.
///
/// The table is recomputed only when the requested `(size, type, sqrt)`
/// triple differs from the cached one, so repeated applies in a frame loop
/// cost one multiply per sample.
///
/// # Example
///
/// ```rust
/// use ondas_core::{GainCompensation, WindowTable, WindowType};
///
/// let mut table = WindowTable::new(4096);
/// let input = vec![1.0; 1024];
/// let mut output = vec![0.0; 1024];
/// table
///     .apply(
///         &input,
///         &mut output,
///         WindowType::Hann,
///         false,
///         1.0,
///         GainCompensation::None,
///     )
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct WindowTable {
    values: Vec<f64>,
    max_size: usize,
    size: usize,
    kind: WindowType,
    sqrt_applied: bool,
    linear_gain: f64,
    square_gain: f64,
    generation: u64,
}

impl WindowTable {
    /// Creates a table able to hold windows up to `max_size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "Window capacity must be > 0");

        Self {
            values: vec![0.0; max_size],
            max_size,
            size: 0,
            kind: WindowType::Rect,
            sqrt_applied: false,
            linear_gain: 1.0,
            square_gain: 1.0,
            generation: 0,
        }
    }

    /// Maximum window size in samples.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Mean of the cached window coefficients.
    pub fn mean_gain(&self) -> f64 {
        self.linear_gain
    }

    /// Mean of the squared cached window coefficients.
    pub fn mean_square_gain(&self) -> f64 {
        self.square_gain
    }

    /// Bumped each time the coefficient table is rebuilt. Consumers holding
    /// derived state (e.g. precomputed spectra of the window) can compare
    /// generations instead of re-deriving per call.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Windows `input` into `output` with the given type and compensation.
    ///
    /// `fixed_gain` is an extra scalar folded into the same pass. Fails with
    /// [`CoreError::CapacityExceeded`] when the buffers are longer than the
    /// table capacity and [`CoreError::ShapeMismatch`] when input and output
    /// lengths differ.
    pub fn apply(
        &mut self,
        input: &[f64],
        output: &mut [f64],
        kind: WindowType,
        apply_sqrt: bool,
        fixed_gain: f64,
        compensation: GainCompensation,
    ) -> Result<()> {
        if input.len() != output.len() {
            return Err(CoreError::ShapeMismatch("input/output length differ"));
        }
        self.update_table(input.len(), kind, apply_sqrt)?;

        let gain = fixed_gain * self.compensation_gain(compensation);
        for (out, (sample, w)) in output.iter_mut().zip(input.iter().zip(self.values.iter())) {
            *out = sample * w * gain;
        }
        Ok(())
    }

    /// In-place variant of [`apply`](Self::apply).
    pub fn apply_in_place(
        &mut self,
        buffer: &mut [f64],
        kind: WindowType,
        apply_sqrt: bool,
        fixed_gain: f64,
        compensation: GainCompensation,
    ) -> Result<()> {
        self.update_table(buffer.len(), kind, apply_sqrt)?;

        let gain = fixed_gain * self.compensation_gain(compensation);
        for (sample, w) in buffer.iter_mut().zip(self.values.iter()) {
            *sample *= w * gain;
        }
        Ok(())
    }

    /// The cached coefficients for the current `(size, type, sqrt)` triple.
    pub fn coefficients(&self) -> &[f64] {
        &self.values[..self.size]
    }

    fn compensation_gain(&self, compensation: GainCompensation) -> f64 {
        match compensation {
            GainCompensation::None => 1.0,
            GainCompensation::Linear => 1.0 / self.linear_gain,
            GainCompensation::Square => 1.0 / self.square_gain,
            GainCompensation::SquareOverLinear => self.linear_gain / self.square_gain,
        }
    }

    fn update_table(&mut self, size: usize, kind: WindowType, apply_sqrt: bool) -> Result<()> {
        if size == 0 {
            return Err(CoreError::ShapeMismatch("empty buffer"));
        }
        if size > self.max_size {
            return Err(CoreError::CapacityExceeded {
                requested: size,
                maximum: self.max_size,
            });
        }
        if size == self.size && kind == self.kind && apply_sqrt == self.sqrt_applied {
            return Ok(());
        }

        let n = size as f64;
        for (i, w) in self.values[..size].iter_mut().enumerate() {
            *w = window_value(kind, i as f64 / n);
        }
        if apply_sqrt {
            for w in &mut self.values[..size] {
                *w = sqrt(*w);
            }
        }

        let mut linear = 0.0;
        let mut square = 0.0;
        for &w in &self.values[..size] {
            linear += w;
            square += w * w;
        }
        self.linear_gain = linear / n;
        self.square_gain = square / n;

        self.size = size;
        self.kind = kind;
        self.sqrt_applied = apply_sqrt;
        self.generation += 1;
        Ok(())
    }
}

/// Evaluates a window at normalised position `phase = i / N` in `[0, 1)`.
fn window_value(kind: WindowType, phase: f64) -> f64 {
    let x = core::f64::consts::TAU * phase;
    match kind {
        WindowType::Rect => 1.0,
        WindowType::Hann => 0.5 - 0.5 * cos(x),
        WindowType::Hamming => 0.54 - 0.46 * cos(x),
        WindowType::Kaiser => {
            let r = 2.0 * phase - 1.0;
            bessel_i0(KAISER_ALPHA * sqrt(1.0 - r * r)) / bessel_i0(KAISER_ALPHA)
        }
        WindowType::Triangle => 1.0 - fabs(2.0 * phase - 1.0),
        WindowType::Cosine => sin(core::f64::consts::PI * phase),
        WindowType::Blackman => {
            // Exact Blackman: 7938/18608, 9240/18608, 1430/18608
            0.42659071367153911 - 0.49656061908856405 * cos(x) + 0.07684866724081701 * cos(2.0 * x)
        }
        WindowType::Blackman62 => 0.44859 - 0.49364 * cos(x) + 0.05677 * cos(2.0 * x),
        WindowType::Blackman70 => 0.42323 - 0.49755 * cos(x) + 0.07922 * cos(2.0 * x),
        WindowType::Blackman74 => {
            0.402217 - 0.49703 * cos(x) + 0.09892 * cos(2.0 * x) - 0.00188 * cos(3.0 * x)
        }
        // The minimum 4-term Blackman-Harris is the -92 dB window, so the two
        // names share coefficients.
        WindowType::Blackman92 | WindowType::BlackmanHarris => {
            0.35875 - 0.48829 * cos(x) + 0.14128 * cos(2.0 * x) - 0.01168 * cos(3.0 * x)
        }
        WindowType::FlatTop => 0.2810639 - 0.5208972 * cos(x) + 0.1980399 * cos(2.0 * x),
    }
}

/// Zeroth-order modified Bessel function of the first kind, by series
/// expansion. Terms are accumulated until they no longer change the sum.
fn bessel_i0(x: f64) -> f64 {
    let half_sq = (x * 0.5) * (x * 0.5);
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= half_sq / (k * k);
        if sum + term == sum {
            break;
        }
        sum += term;
        k += 1.0;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windowed(kind: WindowType, size: usize) -> Vec<f64> {
        let mut table = WindowTable::new(size);
        let input = vec![1.0; size];
        let mut output = vec![0.0; size];
        table
            .apply(&input, &mut output, kind, false, 1.0, GainCompensation::None)
            .unwrap();
        output
    }

    #[test]
    fn test_hann_shape() {
        let w = windowed(WindowType::Hann, 128);

        // Periodic Hann: zero at the left edge, one at the centre
        assert!(w[0].abs() < 1e-12);
        assert!((w[64] - 1.0).abs() < 1e-12);
        // Symmetric about the centre under i/N normalisation
        assert!((w[1] - w[127]).abs() < 1e-12);
    }

    #[test]
    fn test_rect_is_unity() {
        let w = windowed(WindowType::Rect, 64);
        assert!(w.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_kaiser_peak_at_centre() {
        let w = windowed(WindowType::Kaiser, 256);
        assert!((w[128] - 1.0).abs() < 1e-12);
        assert!(w[0] < 0.01);
    }

    #[test]
    fn test_cache_not_rebuilt_for_same_params() {
        let mut table = WindowTable::new(256);
        let input = vec![1.0; 256];
        let mut output = vec![0.0; 256];

        table
            .apply(&input, &mut output, WindowType::Hann, false, 1.0, GainCompensation::None)
            .unwrap();
        let generation = table.generation();

        table
            .apply(&input, &mut output, WindowType::Hann, false, 2.0, GainCompensation::Linear)
            .unwrap();
        assert_eq!(table.generation(), generation);

        table
            .apply(&input, &mut output, WindowType::Hamming, false, 1.0, GainCompensation::None)
            .unwrap();
        assert_eq!(table.generation(), generation + 1);
    }

    #[test]
    fn test_sqrt_window_squares_to_plain() {
        let size = 512;
        let mut table = WindowTable::new(size);
        let input = vec![1.0; size];

        let mut once = vec![0.0; size];
        table
            .apply(&input, &mut once, WindowType::Hann, true, 1.0, GainCompensation::None)
            .unwrap();
        let mut twice = once.clone();
        table
            .apply_in_place(&mut twice, WindowType::Hann, true, 1.0, GainCompensation::None)
            .unwrap();

        let plain = windowed(WindowType::Hann, size);
        for (a, b) in twice.iter().zip(plain.iter()) {
            assert!((a - b).abs() < 1e-12, "sqrt window twice != plain window");
        }
    }

    #[test]
    fn test_linear_compensation_restores_dc() {
        let size = 1024;
        let mut table = WindowTable::new(size);
        let input = vec![1.0; size];
        let mut output = vec![0.0; size];
        table
            .apply(&input, &mut output, WindowType::Hann, false, 1.0, GainCompensation::Linear)
            .unwrap();

        // Mean of the compensated window is one
        let mean = output.iter().sum::<f64>() / size as f64;
        assert!((mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_oversize_fails() {
        let mut table = WindowTable::new(64);
        let input = vec![1.0; 128];
        let mut output = vec![0.0; 128];
        let result = table.apply(
            &input,
            &mut output,
            WindowType::Hann,
            false,
            1.0,
            GainCompensation::None,
        );
        assert_eq!(
            result,
            Err(CoreError::CapacityExceeded {
                requested: 128,
                maximum: 64
            })
        );
    }

    #[test]
    fn test_bessel_i0_known_values() {
        // I0(0) = 1, I0(1) ~ 1.26606587775201
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-15);
        assert!((bessel_i0(1.0) - 1.26606587775201).abs() < 1e-11);
    }

    #[test]
    fn test_flat_top_mean_positive() {
        let w = windowed(WindowType::FlatTop, 256);
        let mean = w.iter().sum::<f64>() / 256.0;
        assert!(mean > 0.25 && mean < 0.3);
    }
}
