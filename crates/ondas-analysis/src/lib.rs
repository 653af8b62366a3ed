//! Ondas Analysis - wavelet and multi-taper spectral estimation
//!
//! This crate provides the numeric heart of the ondas toolkit: power-spectrum
//! estimation with sinusoidal multi-tapers, periodic wavelet transforms, and
//! wavelet-domain denoising of log spectra, plus spectral peak picking.
//!
//! - [`fft`] - Real-input FFT adaptor over rustfft with plan caching
//! - [`spectrum`] - Power-spectrum carrier with Nyquist/Full layouts
//! - [`wavelet`] - FIR filter banks for the DWT (analysis stored reversed)
//! - [`dwt`] - Single- and multi-level periodic DWT, in-place capable
//! - [`multitaper`] - Sinusoidal multi-taper estimator with adaptive
//!   refinement
//! - [`shrinkage`] - Universal-threshold denoising of the log power spectrum
//! - [`peaks`] - Spectral peak picking with parabolic refinement
//!
//! ## Example Workflow
//!
//! ```rust,ignore
//! use ondas_analysis::{MultiTaper, PeakPicker, PowerSpectrum, SpectrumFormat};
//!
//! // 1. Estimate a smooth power spectrum from one analysis frame
//! let mut spectrum = PowerSpectrum::new(4096, 48000.0);
//! let mut estimator = MultiTaper::new(4096);
//! estimator.estimate(&mut spectrum, &frame, 8, 4096, 1.0, 0)?;
//!
//! // 2. Pick and refine the spectral peaks
//! let mut picker = PeakPicker::new(4096);
//! for peak in picker.pick(&spectrum)? {
//!     println!("{:.1} Hz: {:.3}", peak.freq * 48000.0, peak.amp);
//! }
//! ```
//!
//! ## Denoising
//!
//! ```rust,ignore
//! use ondas_analysis::{ShrinkageRule, SpectrumDenoiser};
//!
//! let mut denoiser = SpectrumDenoiser::new(4096);
//! denoiser.process(
//!     &mut spectrum,
//!     &frame,
//!     8,          // tapers
//!     4096,       // fft size
//!     1.0,        // scale
//!     0,          // adaptive iterations
//!     5,          // shrinkage levels
//!     ShrinkageRule::UniversalSoft,
//! )?;
//! ```
//!
//! All samples are `f64`. Components preallocate to a constructor-time
//! maximum FFT size and fail fast (leaving state unchanged) when asked to
//! exceed it; see [`AnalysisError`].

pub mod dwt;
pub mod fft;
pub mod multitaper;
pub mod peaks;
pub mod shrinkage;
pub mod spectrum;
pub mod wavelet;

// Re-export main types
pub use dwt::DwtEngine;
pub use fft::{Fft, previous_power_of_two};
pub use multitaper::MultiTaper;
pub use peaks::{Peak, PeakPicker};
pub use shrinkage::{ShrinkageRule, SpectrumDenoiser, digamma, trigamma};
pub use spectrum::{PowerSpectrum, SpectrumFormat};
pub use wavelet::WaveletBank;

use ondas_core::CoreError;

/// Error type for spectral and wavelet operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Requested size exceeds a constructor-time maximum.
    #[error("requested size {requested} exceeds maximum {maximum}")]
    CapacityExceeded {
        /// The size that was asked for.
        requested: usize,
        /// The maximum fixed at construction.
        maximum: usize,
    },
    /// Buffer length, filter length, or level count incompatible with state.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    /// A framing-layer operation failed inside an analysis pipeline.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
