//! Complex Q1.15 sample type and wide-result arithmetic.
//!
//! The butterfly datapath never overflows silently: `add`, `sub` and `mul`
//! all return a [`WideComplex`] intermediate that keeps the full precision
//! of the operation, together with a flag telling whether either component
//! left the representable Q1.15 range (the two guard bits above bit 14
//! disagree, the classic two's-complement overflow signature). Narrowing
//! back to 16 bits is the rescale unit's job.

/// Scale of the Q1.15 format: 1.0 maps to `1 << 15`.
pub const Q15_SCALE: f64 = 32768.0;

/// A complex sample with signed Q1.15 real and imaginary components.
///
/// Representable range per component: `[-1.0, 1.0 - 2^-15]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedComplex {
    pub re: i16,
    pub im: i16,
}

impl FixedComplex {
    pub const ZERO: Self = Self { re: 0, im: 0 };

    pub const fn new(re: i16, im: i16) -> Self {
        Self { re, im }
    }

    /// Quantizes a pair of floats into Q1.15, rounding to nearest and
    /// clamping to the representable range (so `1.0` becomes `0x7FFF`).
    pub fn from_f64(re: f64, im: f64) -> Self {
        Self {
            re: quantize(re),
            im: quantize(im),
        }
    }

    /// Converts back to floats, for test tooling and diagnostics.
    pub fn to_f64(self) -> (f64, f64) {
        (self.re as f64 / Q15_SCALE, self.im as f64 / Q15_SCALE)
    }

    /// Packs the sample into a bus word: `[31:16]` real, `[15:0]` imaginary.
    pub fn to_word(self) -> u32 {
        ((self.re as u16 as u32) << 16) | (self.im as u16 as u32)
    }

    /// Unpacks a bus word (`[31:16]` real, `[15:0]` imaginary).
    pub fn from_word(word: u32) -> Self {
        Self {
            re: (word >> 16) as u16 as i16,
            im: word as u16 as i16,
        }
    }

    /// Widens the sample without changing its value.
    pub fn widen(self) -> WideComplex {
        WideComplex {
            re: self.re as i32,
            im: self.im as i32,
        }
    }

    /// Full-precision complex addition.
    ///
    /// Returns the 17-bit-per-component intermediate and whether either
    /// component overflowed the Q1.15 range.
    pub fn add(self, other: Self) -> (WideComplex, bool) {
        let wide = WideComplex {
            re: self.re as i32 + other.re as i32,
            im: self.im as i32 + other.im as i32,
        };
        let overflow = wide.exceeds_q15();
        (wide, overflow)
    }

    /// Full-precision complex subtraction.
    pub fn sub(self, other: Self) -> (WideComplex, bool) {
        let wide = WideComplex {
            re: self.re as i32 - other.re as i32,
            im: self.im as i32 - other.im as i32,
        };
        let overflow = wide.exceeds_q15();
        (wide, overflow)
    }

    /// Full-precision complex multiplication (four-multiply form).
    ///
    /// The Q2.30 products are shifted right by 15 to return to Q1.15 scale;
    /// the result may still occupy 17 bits per component.
    pub fn mul(self, other: Self) -> (WideComplex, bool) {
        let a_re = self.re as i64;
        let a_im = self.im as i64;
        let b_re = other.re as i64;
        let b_im = other.im as i64;

        let wide = WideComplex {
            re: ((a_re * b_re - a_im * b_im) >> 15) as i32,
            im: ((a_re * b_im + a_im * b_re) >> 15) as i32,
        };
        let overflow = wide.exceeds_q15();
        (wide, overflow)
    }
}

/// Double-width complex intermediate produced by the arithmetic above.
///
/// Invariant: a `WideComplex` must pass through the rescale unit before it
/// is stored back into a sample buffer; it is never a "final" value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WideComplex {
    pub re: i32,
    pub im: i32,
}

impl WideComplex {
    /// Multiplies this wide value by a Q1.15 coefficient.
    ///
    /// Used for the butterfly's `(a - b) * w` product, where the difference
    /// has not been narrowed yet. Products are computed in 64 bits and
    /// shifted back to Q1.15 scale.
    pub fn mul(self, other: FixedComplex) -> (WideComplex, bool) {
        let a_re = self.re as i64;
        let a_im = self.im as i64;
        let b_re = other.re as i64;
        let b_im = other.im as i64;

        let wide = WideComplex {
            re: ((a_re * b_re - a_im * b_im) >> 15) as i32,
            im: ((a_re * b_im + a_im * b_re) >> 15) as i32,
        };
        let overflow = wide.exceeds_q15();
        (wide, overflow)
    }

    /// True if either component fell outside the Q1.15 range, i.e. the two
    /// most significant guard bits disagree.
    pub fn exceeds_q15(self) -> bool {
        component_exceeds_q15(self.re) || component_exceeds_q15(self.im)
    }

    /// Narrows to 16 bits by clamping each component into the Q1.15 range.
    pub fn saturate(self) -> FixedComplex {
        FixedComplex {
            re: self.re.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            im: self.im.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
    }

    /// Narrows to 16 bits by dropping the guard bits (two's-complement
    /// wrap), matching the hardware's behavior with saturation disabled.
    pub fn truncate(self) -> FixedComplex {
        FixedComplex {
            re: self.re as i16,
            im: self.im as i16,
        }
    }
}

pub(crate) fn component_exceeds_q15(v: i32) -> bool {
    v > i16::MAX as i32 || v < i16::MIN as i32
}

fn quantize(v: f64) -> i16 {
    let scaled = (v * Q15_SCALE).round();
    scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
