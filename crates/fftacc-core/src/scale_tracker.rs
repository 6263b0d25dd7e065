//! Cumulative scale-factor and overflow bookkeeping.
//!
//! The tracker observes every rescale decision the pipeline makes and
//! accumulates the statistics the host reads back after completion: total
//! applied shifts (the scale factor a downstream consumer must undo),
//! overflow count, the last stage that overflowed and the worst overflow
//! magnitude seen.

/// Host-visible scale/overflow statistics for one transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleStats {
    /// Number of halvings applied, saturating at 255.
    pub scale_factor: u8,
    /// Stages completed.
    pub stage_count: u8,
    /// Number of rescale shifts observed, saturating at 255.
    pub overflow_count: u8,
    /// Stage index of the most recent overflow.
    pub last_overflow_stage: u8,
    /// Running maximum of the reported overflow magnitudes.
    pub max_overflow_magnitude: u8,
    /// Sticky: the scale factor saturated, so scale-based reconstruction
    /// is unreliable from that point on.
    pub scale_factor_saturated: bool,
    /// False until a transform starts, and again after a reset abandons
    /// bookkeeping mid-flight.
    pub valid: bool,
}

/// Accumulates [`ScaleStats`] across a transform.
#[derive(Debug, Default)]
pub struct ScaleFactorTracker {
    stats: ScaleStats,
    enabled: bool,
}

impl ScaleFactorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all statistics at the start of a transform.
    ///
    /// When `enabled` is false the pipeline still rescales (samples are
    /// never corrupted) but nothing is recorded.
    pub fn on_transform_start(&mut self, enabled: bool) {
        self.stats = ScaleStats {
            valid: true,
            ..Default::default()
        };
        self.enabled = enabled;
    }

    /// Records one rescale decision from the pipeline.
    pub fn observe(&mut self, shifted: bool, magnitude: u8, stage: u8) {
        if !shifted || !self.enabled {
            return;
        }
        self.bump_scale_factor(1);
        self.stats.overflow_count = self.stats.overflow_count.saturating_add(1);
        self.stats.last_overflow_stage = stage;
        self.stats.max_overflow_magnitude =
            self.stats.max_overflow_magnitude.max(magnitude);
    }

    /// Marks one pipeline stage as completed.
    pub fn on_stage_complete(&mut self) {
        self.stats.stage_count = self.stats.stage_count.saturating_add(1);
    }

    /// Credits the end-of-transform divide-by-N pass, which applies
    /// `log2n` uniform halvings to every output sample.
    pub fn add_final_scale(&mut self, log2n: u8) {
        if self.enabled {
            self.bump_scale_factor(log2n);
        }
    }

    /// Abandons bookkeeping after a reset; host-visible stats are invalid
    /// until the next transform start.
    pub fn invalidate(&mut self) {
        self.stats.valid = false;
    }

    pub fn stats(&self) -> &ScaleStats {
        &self.stats
    }

    fn bump_scale_factor(&mut self, by: u8) {
        match self.stats.scale_factor.checked_add(by) {
            Some(v) => self.stats.scale_factor = v,
            None => {
                if !self.stats.scale_factor_saturated {
                    tracing::warn!(
                        scale_factor = self.stats.scale_factor,
                        "scale factor saturated; scale-based reconstruction \
                         is unreliable for this transform"
                    );
                }
                self.stats.scale_factor = u8::MAX;
                self.stats.scale_factor_saturated = true;
            }
        }
    }
}
