//! Real-input FFT adaptor with plan caching.
//!
//! Wraps rustfft behind the small surface the estimators need: a cached
//! forward/inverse plan pair and a zero-padded real-to-complex transform
//! that returns the full spectrum (both frequency halves). The multi-taper
//! estimator indexes negative frequencies directly, so nothing is truncated
//! to one side here.

use rustfft::{FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Rounds down to the nearest power of two (0 for 0).
pub fn previous_power_of_two(n: usize) -> usize {
    if n == 0 {
        0
    } else if n.is_power_of_two() {
        n
    } else {
        n.next_power_of_two() / 2
    }
}

/// FFT processor with caching
pub struct Fft {
    planner: FftPlanner<f64>,
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self {
            planner,
            fft,
            ifft,
            size,
        }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Resize the FFT (creates new plan if needed)
    pub fn resize(&mut self, size: usize) {
        if size != self.size {
            self.fft = self.planner.plan_fft_forward(size);
            self.ifft = self.planner.plan_fft_inverse(size);
            self.size = size;
        }
    }

    /// Forward-transforms real input into `buffer`, zero-padding (or
    /// truncating) to the planned size.
    ///
    /// `buffer` is resized to the planned size and holds the full spectrum
    /// on return; for real input the upper half is the conjugate mirror of
    /// the lower.
    pub fn forward_real(&self, input: &[f64], buffer: &mut Vec<Complex<f64>>) {
        buffer.clear();
        buffer.extend(
            input
                .iter()
                .take(self.size)
                .map(|&x| Complex::new(x, 0.0)),
        );
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(buffer);
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f64>]) {
        self.fft.process(buffer);
    }

    /// Perform inverse FFT on complex buffer (in-place), normalized
    pub fn inverse_complex(&self, buffer: &mut [Complex<f64>]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_forward_real_peak_bin() {
        let fft = Fft::new(256);
        let input: Vec<f64> = (0..256).map(|i| (TAU * 10.0 * i as f64 / 256.0).sin()).collect();

        let mut spectrum = Vec::new();
        fft.forward_real(&input, &mut spectrum);
        assert_eq!(spectrum.len(), 256);

        let peak_bin = (0..128)
            .max_by(|&a, &b| spectrum[a].norm().partial_cmp(&spectrum[b].norm()).unwrap())
            .unwrap();
        assert_eq!(peak_bin, 10);
        // Conjugate symmetry of the real input
        assert!((spectrum[10].norm() - spectrum[246].norm()).abs() < 1e-9);
    }

    #[test]
    fn test_forward_real_zero_pads() {
        let fft = Fft::new(64);
        let input = [1.0; 16];

        let mut spectrum = Vec::new();
        fft.forward_real(&input, &mut spectrum);

        // DC bin is the sum of the 16 non-zero samples
        assert!((spectrum[0].re - 16.0).abs() < 1e-12);
        assert!(spectrum[0].im.abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_complex() {
        let fft = Fft::new(128);
        let mut buffer: Vec<Complex<f64>> = (0..128)
            .map(|i| Complex::new((TAU * 3.0 * i as f64 / 128.0).cos(), 0.0))
            .collect();
        let original = buffer.clone();

        fft.forward_complex(&mut buffer);
        fft.inverse_complex(&mut buffer);

        for (a, b) in buffer.iter().zip(original.iter()) {
            assert!((a.re - b.re).abs() < 1e-10);
            assert!(a.im.abs() < 1e-10);
        }
    }

    #[test]
    fn test_previous_power_of_two() {
        assert_eq!(previous_power_of_two(0), 0);
        assert_eq!(previous_power_of_two(1), 1);
        assert_eq!(previous_power_of_two(1023), 512);
        assert_eq!(previous_power_of_two(1024), 1024);
        assert_eq!(previous_power_of_two(1025), 1024);
    }

    #[test]
    fn test_resize_replans() {
        let mut fft = Fft::new(64);
        fft.resize(128);
        assert_eq!(fft.size(), 128);

        let mut spectrum = Vec::new();
        fft.forward_real(&[1.0; 128], &mut spectrum);
        assert_eq!(spectrum.len(), 128);
    }
}
