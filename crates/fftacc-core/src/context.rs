//! Per-transform configuration and mutable context.

use fftacc_fixed::{RescaleControl, RoundMode};

use crate::buffer::BufferId;
use crate::error::ConfigError;
use crate::{N_MAX, N_MIN};

/// When rescaling divides the signal down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RescaleMode {
    /// Conditionally halve overflowing samples as each stage computes.
    #[default]
    PerStage,
    /// Run the stages unscaled, then divide every output sample by N in a
    /// single end-of-transform pass.
    FinalDivideByN,
}

/// Host-selected parameters for one transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformConfig {
    /// Transform length; power of two in `[256, 4096]`.
    pub n: usize,
    pub rescale_mode: RescaleMode,
    pub round_mode: RoundMode,
    /// Clamp narrowed samples into Q1.15 instead of wrapping.
    pub saturate: bool,
    /// Master overflow-detection enable; without it the rescale unit never
    /// fires and no overflow statistics accumulate.
    pub overflow_detect: bool,
    /// Per-stage rescaling enable (only meaningful in `PerStage` mode).
    pub rescale_enabled: bool,
    /// Scale-factor/overflow bookkeeping enable.
    pub scale_tracking: bool,
    /// Overflow detection threshold, 0..=15 (see the rescale unit).
    pub threshold: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            n: N_MIN,
            rescale_mode: RescaleMode::PerStage,
            round_mode: RoundMode::Truncate,
            saturate: false,
            overflow_detect: true,
            rescale_enabled: true,
            scale_tracking: true,
            threshold: 0,
        }
    }
}

impl TransformConfig {
    /// Validates the transform length, returning `log2(n)`.
    ///
    /// Invalid lengths are rejected, never clamped to a default: the host
    /// must reconfigure and restart.
    pub fn validate(&self) -> Result<u8, ConfigError> {
        if !self.n.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo(self.n));
        }
        if self.n < N_MIN || self.n > N_MAX {
            return Err(ConfigError::LengthOutOfRange(self.n));
        }
        Ok(self.n.trailing_zeros() as u8)
    }

    /// Cross-checks an explicit log2-length field against `n` and then
    /// validates as usual (register-surface start path).
    pub fn validate_with_log2(&self, log2: u8) -> Result<u8, ConfigError> {
        let computed = self.validate()?;
        if computed != log2 {
            return Err(ConfigError::LengthMismatch {
                log2,
                length: self.n,
            });
        }
        Ok(computed)
    }

    /// The effective rescale-unit control for the compute phase.
    pub(crate) fn stage_rescale_control(&self) -> RescaleControl {
        RescaleControl {
            enabled: self.overflow_detect
                && self.rescale_enabled
                && self.rescale_mode == RescaleMode::PerStage,
            round: self.round_mode,
            saturate: self.saturate,
            threshold: self.threshold,
        }
    }
}

/// Mutable state of the transform in flight.
///
/// Created when a transform leaves `Config`, mutated only by the
/// controller and the pipeline, dropped when the transform completes or is
/// aborted.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext {
    pub cfg: TransformConfig,
    pub log2n: u8,
    /// The buffer set this transform owns.
    pub buffer: BufferId,
}

impl TransformContext {
    pub fn new(cfg: TransformConfig, log2n: u8, buffer: BufferId) -> Self {
        Self { cfg, log2n, buffer }
    }
}
