//! Power-spectrum carrier.
//!
//! A [`PowerSpectrum`] couples the raw bin data with everything needed to
//! interpret it: the FFT size that produced it, the storage layout, and the
//! sampling rate. Capacity is fixed at construction; producers that cannot
//! fit their result fail rather than reallocate.

use crate::{AnalysisError, Result};

/// Storage convention for a real-input power spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumFormat {
    /// One-sided: `N/2 + 1` bins, DC through Nyquist.
    #[default]
    Nyquist,
    /// Two-sided: `N` bins, mirror-symmetric for real inputs.
    Full,
}

/// A real power spectrum with a fixed maximum FFT size.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::{PowerSpectrum, SpectrumFormat};
///
/// let mut spectrum = PowerSpectrum::new(4096, 48000.0);
/// spectrum.set_fft_size(1024).unwrap();
/// assert_eq!(spectrum.num_bins(), 513);
/// assert_eq!(spectrum.format(), SpectrumFormat::Nyquist);
/// assert!((spectrum.bin_to_freq(512) - 24000.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    data: Vec<f64>,
    max_fft_size: usize,
    fft_size: usize,
    format: SpectrumFormat,
    sample_rate: f64,
}

impl PowerSpectrum {
    /// Creates a zeroed spectrum able to hold FFT sizes up to
    /// `max_fft_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_fft_size` is 0.
    pub fn new(max_fft_size: usize, sample_rate: f64) -> Self {
        assert!(max_fft_size > 0, "Spectrum capacity must be > 0");

        Self {
            data: vec![0.0; max_fft_size],
            max_fft_size,
            fft_size: max_fft_size,
            format: SpectrumFormat::default(),
            sample_rate,
        }
    }

    /// Maximum FFT size this spectrum can carry.
    pub fn max_fft_size(&self) -> usize {
        self.max_fft_size
    }

    /// FFT size of the current contents.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Sets the FFT size, failing on capacity. Bin data is left as-is; the
    /// producer overwrites it.
    pub fn set_fft_size(&mut self, fft_size: usize) -> Result<()> {
        if fft_size == 0 || fft_size > self.max_fft_size {
            return Err(AnalysisError::CapacityExceeded {
                requested: fft_size,
                maximum: self.max_fft_size,
            });
        }
        self.fft_size = fft_size;
        Ok(())
    }

    /// Storage layout of the current contents.
    pub fn format(&self) -> SpectrumFormat {
        self.format
    }

    /// Sets the storage layout. Going from `Full` to `Nyquist` simply
    /// truncates the view (the one-sided bins are a prefix of the
    /// two-sided data); going the other way leaves the mirror half stale
    /// until [`mirror`](Self::mirror) or a producer fills it.
    pub fn set_format(&mut self, format: SpectrumFormat) {
        self.format = format;
    }

    /// Sampling rate of the audio that produced this spectrum.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Updates the sampling rate annotation.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Number of valid bins in the current layout.
    pub fn num_bins(&self) -> usize {
        match self.format {
            SpectrumFormat::Nyquist => self.fft_size / 2 + 1,
            SpectrumFormat::Full => self.fft_size,
        }
    }

    /// Centre frequency of a bin in Hz.
    pub fn bin_to_freq(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate / self.fft_size as f64
    }

    /// The valid bins.
    pub fn bins(&self) -> &[f64] {
        &self.data[..self.num_bins()]
    }

    /// The valid bins, mutable.
    pub fn bins_mut(&mut self) -> &mut [f64] {
        let n = self.num_bins();
        &mut self.data[..n]
    }

    /// Copies the one-sided bins into the mirror half and switches the
    /// layout to `Full`.
    pub fn mirror(&mut self) {
        let n = self.fft_size;
        for bin in 1..n / 2 {
            self.data[n - bin] = self.data[bin];
        }
        self.format = SpectrumFormat::Full;
    }

    /// Copies layout, size, rate, and bins from another spectrum.
    pub fn copy_from(&mut self, other: &PowerSpectrum) -> Result<()> {
        self.set_fft_size(other.fft_size)?;
        self.format = other.format;
        self.sample_rate = other.sample_rate;
        let n = other.num_bins();
        self.data[..n].copy_from_slice(&other.data[..n]);
        Ok(())
    }
}
