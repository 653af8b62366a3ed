//! FIR filter banks for the discrete wavelet transform.
//!
//! A [`WaveletBank`] holds the low/high analysis pair and, optionally, an
//! independent synthesis pair; without one, synthesis reuses the analysis
//! filters (the orthogonal-bank case).
//!
//! Analysis filters are stored in **reversed order** relative to the
//! mathematical convolution kernel, so the transform itself runs as a plain
//! correlation. [`WaveletBank::from_lowpass`] accepts coefficients in
//! mathematical order and reverses them internally;
//! [`WaveletBank::from_reversed`] takes them as stored. The matched
//! high-pass is always derived as the quadrature mirror
//! `high[i] = low[len-1-i] * (-1)^i`, with the grid offset carried over
//! unchanged.

/// One low/high filter pair plus its downsampling-grid offset.
#[derive(Debug, Clone, PartialEq)]
struct FilterPair {
    low: Vec<f64>,
    high: Vec<f64>,
    offset: isize,
}

impl FilterPair {
    fn new(low: Vec<f64>, offset: isize) -> Self {
        let high = derive_highpass(&low);
        Self { low, high, offset }
    }
}

/// Quadrature-mirror high-pass: reversed index order, alternating sign.
fn derive_highpass(low: &[f64]) -> Vec<f64> {
    let len = low.len();
    (0..len)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            low[len - 1 - i] * sign
        })
        .collect()
}

/// Analysis/synthesis filter bank for the periodic DWT.
///
/// # Example
///
/// ```rust
/// use ondas_analysis::WaveletBank;
///
/// let bank = WaveletBank::haar();
/// assert_eq!(bank.analysis_low().len(), 2);
/// // Synthesis falls back to the analysis pair
/// assert_eq!(bank.synthesis_low(), bank.analysis_low());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletBank {
    analysis: FilterPair,
    synthesis: Option<FilterPair>,
}

impl WaveletBank {
    /// Builds a bank from a low-pass given in **stored (reversed)** order.
    ///
    /// `offset` aligns the downsampling grid; it shifts where each output
    /// coefficient's support starts in the input.
    ///
    /// # Panics
    ///
    /// Panics if `low` is empty.
    pub fn from_reversed(low: &[f64], offset: isize) -> Self {
        assert!(!low.is_empty(), "Filter must have at least one tap");

        Self {
            analysis: FilterPair::new(low.to_vec(), offset),
            synthesis: None,
        }
    }

    /// Builds a bank from a low-pass given in **mathematical (impulse
    /// response)** order, reversing it into stored order internally. Prefer
    /// this when transcribing published wavelet coefficients.
    ///
    /// # Panics
    ///
    /// Panics if `low` is empty.
    pub fn from_lowpass(low: &[f64], offset: isize) -> Self {
        let reversed: Vec<f64> = low.iter().rev().copied().collect();
        Self::from_reversed(&reversed, offset)
    }

    /// The Haar bank (orthogonal, two taps).
    pub fn haar() -> Self {
        Self::from_reversed(&[std::f64::consts::FRAC_1_SQRT_2; 2], 0)
    }

    /// The Daubechies-4 bank (orthogonal, four taps).
    pub fn daubechies4() -> Self {
        // Mathematical-order D4 low-pass: (1±sqrt 3) / (4 sqrt 2) family
        Self::from_lowpass(
            &[
                0.4829629131445341,
                0.8365163037378079,
                0.2241438680420134,
                -0.1294095225512604,
            ],
            0,
        )
    }

    /// Replaces the analysis pair (stored order). Any independent synthesis
    /// pair is kept.
    pub fn set_analysis(&mut self, low: &[f64], offset: isize) {
        assert!(!low.is_empty(), "Filter must have at least one tap");
        self.analysis = FilterPair::new(low.to_vec(), offset);
    }

    /// Installs an independent synthesis pair (stored order).
    pub fn set_synthesis(&mut self, low: &[f64], offset: isize) {
        assert!(!low.is_empty(), "Filter must have at least one tap");
        self.synthesis = Some(FilterPair::new(low.to_vec(), offset));
    }

    /// Drops any independent synthesis pair so synthesis reuses analysis.
    pub fn share_synthesis(&mut self) {
        self.synthesis = None;
    }

    /// Whether synthesis reuses the analysis filters.
    pub fn synthesis_is_shared(&self) -> bool {
        self.synthesis.is_none()
    }

    /// Analysis low-pass, stored order.
    pub fn analysis_low(&self) -> &[f64] {
        &self.analysis.low
    }

    /// Analysis high-pass, stored order.
    pub fn analysis_high(&self) -> &[f64] {
        &self.analysis.high
    }

    /// Analysis grid offset.
    pub fn analysis_offset(&self) -> isize {
        self.analysis.offset
    }

    /// Synthesis low-pass (the analysis one when shared).
    pub fn synthesis_low(&self) -> &[f64] {
        &self.synthesis.as_ref().unwrap_or(&self.analysis).low
    }

    /// Synthesis high-pass (the analysis one when shared).
    pub fn synthesis_high(&self) -> &[f64] {
        &self.synthesis.as_ref().unwrap_or(&self.analysis).high
    }

    /// Synthesis grid offset (the analysis one when shared).
    pub fn synthesis_offset(&self) -> isize {
        self.synthesis.as_ref().unwrap_or(&self.analysis).offset
    }
}
