//! Computational core of the fixed-point streaming FFT accelerator model.
//!
//! The core combines:
//! - [`twiddle::TwiddleTable`] — quarter-wave twiddle coefficient storage
//! - [`scale_tracker::ScaleFactorTracker`] — cumulative scale/overflow stats
//! - [`buffer::BufferPair`] — double-buffered sample storage with atomic
//!   active/background swap
//! - [`pipeline::ButterflyPipeline`] — the six-stage tick-driven butterfly
//!   engine
//! - [`controller::TransformController`] — the state machine sequencing a
//!   transform from configuration to completion
//!
//! The whole core is a deterministic single-threaded golden model: one call
//! to [`controller::TransformController::tick`] advances every in-flight
//! butterfly by exactly one pipeline step.

#![deny(unsafe_code)]

pub mod buffer;
pub mod context;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod scale_tracker;
pub mod twiddle;

pub use buffer::{BufferId, BufferPair};
pub use context::{RescaleMode, TransformConfig, TransformContext};
pub use controller::{Event, Progress, State, TransformController};
pub use error::{ConfigError, CoreError, ErrorCode};
pub use scale_tracker::{ScaleFactorTracker, ScaleStats};
pub use twiddle::TwiddleTable;

/// Largest supported transform length.
pub const N_MAX: usize = 4096;

/// Smallest supported transform length.
pub const N_MIN: usize = 256;
