//! Overflow-driven conditional rescaling of butterfly results.
//!
//! The rescale unit inspects a wide butterfly intermediate and, when the
//! overflow signature is present and rescaling is enabled, halves both
//! components (arithmetic right shift, optionally rounded) so the value
//! fits back into Q1.15. It reports whether a shift happened and a severity
//! byte so the scale-factor tracker can keep cumulative bookkeeping.
//!
//! The unit is stateless; the same inputs always produce the same decision.

use crate::complex::{component_exceeds_q15, FixedComplex, WideComplex};

/// How the discarded bit is treated when a sample is halved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundMode {
    /// Drop the discarded bit (arithmetic shift only).
    #[default]
    Truncate,
    /// Add one to the shifted value if the discarded bit was set.
    Round,
}

/// Static inputs of a rescale decision.
#[derive(Debug, Clone, Copy)]
pub struct RescaleControl {
    /// Master enable; when false the unit only narrows, never shifts.
    pub enabled: bool,
    pub round: RoundMode,
    /// Clamp the final value into Q1.15 instead of wrapping.
    pub saturate: bool,
    /// Detection threshold 0..=15: overflow triggers once a component
    /// exceeds `0x7FFF >> threshold`. Zero means exact-range detection.
    pub threshold: u8,
}

impl Default for RescaleControl {
    fn default() -> Self {
        Self {
            enabled: false,
            round: RoundMode::Truncate,
            saturate: false,
            threshold: 0,
        }
    }
}

/// Outcome of one rescale decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rescaled {
    /// The narrowed (and possibly halved) sample.
    pub sample: FixedComplex,
    /// True if the sample was halved.
    pub shifted: bool,
    /// True if the overflow signature was present, whether or not a shift
    /// was applied (feeds the sticky overflow-detected status bit).
    pub detected: bool,
    /// Top byte of the largest out-of-range component before the shift;
    /// zero when nothing overflowed.
    pub magnitude: u8,
}

/// Applies one rescale decision to a wide butterfly intermediate.
///
/// Detection looks at each component independently: the two guard bits
/// disagreeing (value outside Q1.15), or outside the threshold-narrowed
/// range when `ctl.threshold > 0`. A shift always halves *both* components
/// so the complex phase is preserved.
///
/// At most one halving is ever applied. That renormalizes the 17-bit sum
/// and difference intermediates, but a twiddle product of an unnarrowed
/// difference can occupy 18 bits, and one shift then still leaves the
/// value outside Q1.15: with `saturate` off the narrowing wraps and flips
/// the sign. Hosts that cannot rule out near-full-scale differences must
/// enable saturation.
pub fn rescale(sample: WideComplex, ctl: RescaleControl) -> Rescaled {
    let limit_hi = (0x7FFF_i32) >> ctl.threshold.min(15);
    let limit_lo = -limit_hi - 1;
    let out_of_range =
        |v: i32| v > limit_hi || v < limit_lo || component_exceeds_q15(v);

    let detected = out_of_range(sample.re) || out_of_range(sample.im);

    let (value, shifted, magnitude) = if detected && ctl.enabled {
        let magnitude = overflow_magnitude(sample, limit_hi, limit_lo);
        let halved = WideComplex {
            re: half(sample.re, ctl.round),
            im: half(sample.im, ctl.round),
        };
        (halved, true, magnitude)
    } else {
        (sample, false, 0)
    };

    let narrowed = if ctl.saturate {
        value.saturate()
    } else {
        value.truncate()
    };

    Rescaled {
        sample: narrowed,
        shifted,
        detected,
        magnitude,
    }
}

fn half(v: i32, round: RoundMode) -> i32 {
    let shifted = v >> 1;
    match round {
        RoundMode::Truncate => shifted,
        RoundMode::Round => shifted + (v & 1),
    }
}

fn overflow_magnitude(sample: WideComplex, hi: i32, lo: i32) -> u8 {
    let worst = [sample.re, sample.im]
        .into_iter()
        .filter(|&v| v > hi || v < lo)
        .map(|v| v.unsigned_abs())
        .max()
        .unwrap_or(0);
    (worst >> 8).min(0xFF) as u8
}
