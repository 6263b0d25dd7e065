//! Quarter-wave twiddle factor table.
//!
//! Stores `N_MAX / 4` precomputed `(cos, sin)` pairs covering the first
//! quadrant in Q1.15 and reconstructs the full circle through sign/swap
//! symmetry, a 4x saving over a full-circle table. The table is built once
//! for the maximum supported length; smaller transforms index it with a
//! stride.

use std::f64::consts::PI;

use fftacc_fixed::FixedComplex;

use crate::N_MAX;

/// Number of stored first-quadrant entries.
pub const QUARTER_LEN: usize = N_MAX / 4;

/// Immutable twiddle coefficient storage.
///
/// `lookup` is deterministic, pure and total over valid indices;
/// out-of-range indices are a caller programming error and panic so that
/// pipeline index bugs stay visible in development.
pub struct TwiddleTable {
    /// `cos(2*pi*r / N_MAX)` for `r` in `0..QUARTER_LEN`, Q1.15.
    cos: Vec<i16>,
    /// `sin(2*pi*r / N_MAX)` for `r` in `0..QUARTER_LEN`, Q1.15.
    sin: Vec<i16>,
}

impl TwiddleTable {
    /// Builds the quarter-wave table for the maximum supported length.
    pub fn new() -> Self {
        let mut cos = Vec::with_capacity(QUARTER_LEN);
        let mut sin = Vec::with_capacity(QUARTER_LEN);
        for r in 0..QUARTER_LEN {
            let angle = 2.0 * PI * (r as f64) / (N_MAX as f64);
            let c = FixedComplex::from_f64(angle.cos(), angle.sin());
            cos.push(c.re);
            sin.push(c.im);
        }
        Self { cos, sin }
    }

    /// Looks up the butterfly's twiddle factor `w = e^{-j*2*pi*k/n}`.
    ///
    /// `butterfly` is the index within the stage (`0 <= butterfly < n/2`);
    /// the twiddle exponent is derived from the stage's spacing exactly as
    /// the pipeline's address generator derives its operand addresses.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a supported power of two, `stage` is not below
    /// `log2(n)`, or `butterfly` is not below `n / 2`.
    pub fn lookup(&self, stage: u8, butterfly: usize, n: usize) -> FixedComplex {
        assert!(
            n.is_power_of_two() && n <= N_MAX,
            "unsupported transform length {n}"
        );
        let log2n = n.trailing_zeros() as u8;
        assert!(stage < log2n, "stage {stage} out of range for n={n}");
        assert!(
            butterfly < n / 2,
            "butterfly index {butterfly} out of range for n={n}"
        );

        let spacing = n >> (stage + 1);
        let exponent = (butterfly % spacing) << stage;
        self.at(exponent * (N_MAX / n))
    }

    /// Returns `w(k) = e^{-j*2*pi*k / N_MAX}` via quadrant symmetry.
    ///
    /// Quadrant 0 negates the stored sine (the twiddle convention carries
    /// the minus sign), quadrant 1 swaps roles and negates both, quadrant 2
    /// negates the cosine only, quadrant 3 swaps roles without negation.
    fn at(&self, k: usize) -> FixedComplex {
        assert!(k < N_MAX, "full-circle index {k} out of range");
        let quadrant = k / QUARTER_LEN;
        let r = k % QUARTER_LEN;
        let c = self.cos[r];
        let s = self.sin[r];
        match quadrant {
            0 => FixedComplex::new(c, -s),
            1 => FixedComplex::new(-s, -c),
            2 => FixedComplex::new(-c, s),
            _ => FixedComplex::new(s, c),
        }
    }

    /// Packed ROM word for the read-only coefficient region:
    /// `[31:16]` cosine, `[15:0]` sine of entry `r`.
    pub fn packed_word(&self, r: usize) -> u32 {
        assert!(r < QUARTER_LEN, "twiddle ROM index {r} out of range");
        FixedComplex::new(self.cos[r], self.sin[r]).to_word()
    }
}

impl Default for TwiddleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TwiddleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwiddleTable")
            .field("entries", &self.cos.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    fn direct(k: usize, n: usize) -> FixedComplex {
        let angle = -2.0 * PI * (k as f64) / (n as f64);
        FixedComplex::from_f64(angle.cos(), angle.sin())
    }

    #[test]
    fn cardinal_points() {
        let t = TwiddleTable::new();
        assert_eq!(t.at(0), FixedComplex::new(i16::MAX, 0));
        assert_eq!(t.at(N_MAX / 4), FixedComplex::new(0, -i16::MAX));
        assert_eq!(t.at(N_MAX / 2), FixedComplex::new(-i16::MAX, 0));
        assert_eq!(t.at(3 * N_MAX / 4), FixedComplex::new(0, i16::MAX));
    }

    #[test]
    fn full_circle_matches_direct_computation() {
        let t = TwiddleTable::new();
        for k in 0..N_MAX {
            let got = t.at(k);
            let want = direct(k, N_MAX);
            // Quadrant reconstruction may differ from direct rounding by
            // one LSB at most.
            assert!(
                (got.re as i32 - want.re as i32).abs() <= 1,
                "cos mismatch at k={k}: {} vs {}",
                got.re,
                want.re
            );
            assert!(
                (got.im as i32 - want.im as i32).abs() <= 1,
                "sin mismatch at k={k}: {} vs {}",
                got.im,
                want.im
            );
        }
    }

    #[test]
    fn stride_for_smaller_lengths() {
        let t = TwiddleTable::new();
        // Stage 0 of a 256-point transform: spacing 128, butterfly j uses
        // exponent j.
        for j in 0..128 {
            let got = t.lookup(0, j, 256);
            let want = direct(j, 256);
            assert!((got.re as i32 - want.re as i32).abs() <= 1);
            assert!((got.im as i32 - want.im as i32).abs() <= 1);
        }
    }

    #[test]
    fn later_stages_scale_the_exponent() {
        let t = TwiddleTable::new();
        let n = 1024;
        // Stage 2: spacing n/8, exponent (j % spacing) << 2.
        let spacing = n >> 3;
        for j in [0, 1, 17, spacing - 1, spacing, 2 * spacing + 5] {
            let got = t.lookup(2, j, n);
            let want = direct((j % spacing) << 2, n);
            assert!((got.re as i32 - want.re as i32).abs() <= 1);
            assert!((got.im as i32 - want.im as i32).abs() <= 1);
        }
    }

    #[test]
    fn debug_output_elides_the_tables() {
        let repr = format!("{:?}", TwiddleTable::new());
        assert!(repr.contains("entries: 1024"));
        assert!(!repr.contains("32767"));
    }

    #[test]
    #[should_panic(expected = "stage")]
    fn out_of_range_stage_panics() {
        TwiddleTable::new().lookup(8, 0, 256);
    }

    #[test]
    #[should_panic(expected = "butterfly index")]
    fn out_of_range_butterfly_panics() {
        TwiddleTable::new().lookup(0, 128, 256);
    }

    #[proptest]
    fn symmetry_reconstruction_is_exactly_quadrant_zero_data(
        #[strategy(0usize..N_MAX)] k: usize,
    ) {
        // Whatever the quadrant, the reconstructed value must reuse a
        // first-quadrant magnitude pair.
        let t = TwiddleTable::new();
        let w = t.at(k);
        let r = k % QUARTER_LEN;
        let pair = (t.cos[r], t.sin[r]);
        let mags = (w.re.unsigned_abs(), w.im.unsigned_abs());
        prop_assert!(
            mags == (pair.0.unsigned_abs(), pair.1.unsigned_abs())
                || mags == (pair.1.unsigned_abs(), pair.0.unsigned_abs())
        );
    }
}
