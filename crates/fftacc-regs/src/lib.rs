//! Memory-mapped register surface for the FFT accelerator model.
//!
//! [`FftDevice`] is what a host (or a bus-functional test harness) talks
//! to: word-aligned 32-bit register reads/writes, sample data windows, a
//! write-1-to-clear interrupt register and an optional completion
//! callback. The computational core lives in `fftacc-core`; this crate
//! only decodes, latches and mirrors.

#![deny(unsafe_code)]

pub mod device;
pub mod regmap;

pub use device::{EventCallback, FftDevice, RegError, WINDOW_SAMPLES};
