//! Ondas Core - real-time framing and metering primitives
//!
//! This crate provides the streaming building blocks that sit between a host's
//! arbitrary-length audio blocks and frame-based spectral processing: ring
//! buffers, frame accumulation with fractional hop timing, overlap-add
//! reconstruction, whole-frame delay lines, window tables, and meter
//! ballistics.
//!
//! # Core Abstractions
//!
//! ## Framing
//!
//! - [`IoStream`] - Fixed-capacity multichannel ring with input (copy) and
//!   output (overlap-add) personalities
//! - [`FrameAccumulator`] - Drives a fixed frame size from arbitrary block
//!   sizes, reporting sub-sample hop timing to a frame-processor closure
//! - [`OverlapAdd`] - Windowed frame processing with overlap-add output
//!   reconstruction
//! - [`FrameDelay`] - Delay line whose quantum is one whole frame
//!
//! ## Windowing
//!
//! - [`WindowTable`] - Cached window coefficients with linear/square gain
//!   compensation
//!
//! ## Metering
//!
//! - [`VuBallistics`] - Peak, RMS, LED, and peak-hold tracking
//!
//! ## Shared Buffers
//!
//! - [`SpinLock`] - Minimal test-and-set lock
//! - [`SharedBuffer`] - Published shared-ownership buffer for resize-on-the-fly
//!   (requires the `std` feature)
//!
//! # Sample Format
//!
//! All audio is `f64`. Multichannel data is passed as a slice of per-channel
//! buffers, never interleaved. Block sizes are arbitrary; no alignment or
//! power-of-two requirement.
//!
//! # Real-Time Contract
//!
//! Every component preallocates to its constructor-time maximum and never
//! allocates in the processing path. Operations either succeed or fail fast
//! with a [`CoreError`], leaving state unchanged. There is no internal
//! synchronisation: one audio thread per instance. The only component meant
//! to be shared across threads is [`SharedBuffer`].
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible for embedded audio applications.
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ondas-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod accumulator;
pub mod frame_delay;
pub mod overlap_add;
pub mod shared;
pub mod stream;
pub mod vu;
pub mod window;

// Re-export main types at crate root
pub use accumulator::FrameAccumulator;
pub use frame_delay::FrameDelay;
pub use overlap_add::OverlapAdd;
#[cfg(feature = "std")]
pub use shared::SharedBuffer;
pub use shared::SpinLock;
pub use stream::{IoStream, MAX_CHANNELS, StreamMode};
pub use vu::{PEAK_HOLD_SAMPLES, VuBallistics};
pub use window::{GainCompensation, WindowTable, WindowType};

/// Error type for streaming and framing operations.
///
/// All failures leave the component's state unchanged; the audio thread
/// never stalls on an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Requested size exceeds a constructor-time maximum.
    CapacityExceeded {
        /// The size that was asked for.
        requested: usize,
        /// The maximum fixed at construction.
        maximum: usize,
    },
    /// Channel count, frame size, or buffer length incompatible with state.
    ShapeMismatch(&'static str),
    /// An output-mode stream read asked for more than has been written.
    InsufficientData {
        /// The number of samples requested.
        requested: usize,
        /// The number of samples pending in the stream.
        available: usize,
    },
}

impl core::fmt::Display for CoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CapacityExceeded { requested, maximum } => {
                write!(f, "requested size {requested} exceeds maximum {maximum}")
            }
            Self::ShapeMismatch(msg) => write!(f, "shape mismatch: {msg}"),
            Self::InsufficientData {
                requested,
                available,
            } => {
                write!(f, "read of {requested} samples but only {available} pending")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/// Convenience result type for core operations.
pub type Result<T> = core::result::Result<T, CoreError>;
