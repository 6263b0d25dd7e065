//! Q1.15 fixed-point complex arithmetic for the FFT accelerator model.
//!
//! Provides:
//! - [`FixedComplex`] — a complex sample with 16-bit signed Q1.15 components
//! - [`WideComplex`] — the double-width intermediate every butterfly
//!   operation produces before renormalization
//! - [`rescale`] — the overflow-driven conditional-halving rescale unit
//!
//! Everything in this crate is a pure function; overflow bookkeeping is the
//! caller's job (see the scale-factor tracker in `fftacc-core`).

#![deny(unsafe_code)]

pub mod complex;
pub mod rescale;

pub use complex::{FixedComplex, WideComplex};
pub use rescale::{rescale, RescaleControl, Rescaled, RoundMode};
