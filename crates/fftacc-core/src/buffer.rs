//! Double-buffered sample storage.
//!
//! Two logical buffer sets (A, B), each holding an input and an output
//! region of `N_MAX` samples. Exactly one set is *active* (owned by the
//! in-flight or most recently completed transform); the other is
//! *background* (available for host access). Ownership flips atomically at
//! a defined swap point and never mid-transform: a swap against a busy
//! pair is a contract violation reported immediately, since deferring it
//! would let a running transform observe a torn buffer.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use fftacc_fixed::FixedComplex;

use crate::error::CoreError;
use crate::N_MAX;

/// Identifies one of the two buffer sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Status-register encoding: A = 0, B = 1.
    pub fn bit(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    fn index(self) -> usize {
        self.bit() as usize
    }
}

/// The double-buffered input/output sample memory.
///
/// Sized once at construction for the maximum supported transform length;
/// smaller transforms use a prefix of each region. The active-set flag is
/// an atomic so concurrent status readers never observe a torn value; the
/// mutating operations take `&mut self` and are serialized by the
/// controller that owns the pair.
pub struct BufferPair {
    input: [Vec<FixedComplex>; 2],
    output: [Vec<FixedComplex>; 2],
    active: AtomicU8,
    busy: AtomicBool,
}

impl BufferPair {
    pub fn new() -> Self {
        Self {
            input: [vec![FixedComplex::ZERO; N_MAX], vec![FixedComplex::ZERO; N_MAX]],
            output: [vec![FixedComplex::ZERO; N_MAX], vec![FixedComplex::ZERO; N_MAX]],
            active: AtomicU8::new(BufferId::A.bit()),
            busy: AtomicBool::new(false),
        }
    }

    /// Which set is currently bound to the pipeline.
    pub fn active_id(&self) -> BufferId {
        BufferId::from_bit(self.active.load(Ordering::Acquire))
    }

    pub fn background_id(&self) -> BufferId {
        self.active_id().other()
    }

    /// True while a transform is in flight against the active set.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Flips the active/background roles.
    ///
    /// Only valid when no transform is mid-flight; otherwise the request
    /// is rejected (never queued or silently ignored).
    pub fn swap(&mut self) -> Result<BufferId, CoreError> {
        if self.is_busy() {
            tracing::warn!("buffer swap rejected: transform in flight");
            return Err(CoreError::SwapWhileBusy);
        }
        let next = self.active_id().other();
        self.active.store(next.bit(), Ordering::Release);
        Ok(next)
    }

    /// Stores one sample into an input region.
    ///
    /// # Panics
    ///
    /// Panics if `index >= N_MAX` (the register surface bounds-checks its
    /// windows before calling in).
    pub fn write_input(&mut self, id: BufferId, index: usize, sample: FixedComplex) {
        self.input[id.index()][index] = sample;
    }

    pub fn read_input(&self, id: BufferId, index: usize) -> FixedComplex {
        self.input[id.index()][index]
    }

    pub fn read_output(&self, id: BufferId, index: usize) -> FixedComplex {
        self.output[id.index()][index]
    }

    /// Bulk-loads samples into an input region starting at index 0 (the
    /// block-transfer path; the burst bus shim lands here).
    ///
    /// # Panics
    ///
    /// Panics if more than `N_MAX` samples are supplied.
    pub fn load_input(&mut self, id: BufferId, samples: &[FixedComplex]) {
        assert!(samples.len() <= N_MAX, "input block exceeds buffer capacity");
        self.input[id.index()][..samples.len()].copy_from_slice(samples);
    }

    /// First `n` samples of an output region (block-transfer read path).
    pub fn output_slice(&self, id: BufferId, n: usize) -> &[FixedComplex] {
        &self.output[id.index()][..n]
    }

    /// Copies the first `n` input samples into the working (output) region
    /// of the same set; the pipeline computes in place there, leaving the
    /// host-written input intact.
    pub(crate) fn load_work(&mut self, id: BufferId, n: usize) {
        let (input, output) = (&self.input[id.index()], &mut self.output[id.index()]);
        output[..n].copy_from_slice(&input[..n]);
    }

    /// Mutable working region for the in-flight transform.
    pub(crate) fn work_slice(&mut self, id: BufferId, n: usize) -> &mut [FixedComplex] {
        &mut self.output[id.index()][..n]
    }
}

impl Default for BufferPair {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPair")
            .field("active", &self.active_id())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn starts_with_a_active_and_idle() {
        let b = BufferPair::new();
        assert_eq!(b.active_id(), BufferId::A);
        assert_eq!(b.background_id(), BufferId::B);
        assert!(!b.is_busy());
    }

    #[test]
    fn swap_flips_roles() {
        let mut b = BufferPair::new();
        assert_eq!(b.swap().unwrap(), BufferId::B);
        assert_eq!(b.active_id(), BufferId::B);
        assert_eq!(b.swap().unwrap(), BufferId::A);
    }

    #[test]
    fn swap_rejected_while_busy() {
        let mut b = BufferPair::new();
        b.set_busy(true);
        assert_eq!(b.swap(), Err(CoreError::SwapWhileBusy));
        // The active role must be unchanged after the rejected request.
        assert_eq!(b.active_id(), BufferId::A);

        b.set_busy(false);
        assert!(b.swap().is_ok());
    }

    #[test]
    fn buffers_are_independent() {
        let mut b = BufferPair::new();
        b.write_input(BufferId::A, 3, FixedComplex::new(100, -100));
        b.write_input(BufferId::B, 3, FixedComplex::new(7, 7));
        assert_eq!(b.read_input(BufferId::A, 3), FixedComplex::new(100, -100));
        assert_eq!(b.read_input(BufferId::B, 3), FixedComplex::new(7, 7));
    }

    #[test]
    fn load_work_copies_prefix_only() {
        let mut b = BufferPair::new();
        b.write_input(BufferId::A, 0, FixedComplex::new(1, 2));
        b.write_input(BufferId::A, 255, FixedComplex::new(3, 4));
        b.write_input(BufferId::A, 256, FixedComplex::new(5, 6));

        b.load_work(BufferId::A, 256);
        assert_eq!(b.read_output(BufferId::A, 0), FixedComplex::new(1, 2));
        assert_eq!(b.read_output(BufferId::A, 255), FixedComplex::new(3, 4));
        // Beyond the transform length the working region is untouched.
        assert_eq!(b.read_output(BufferId::A, 256), FixedComplex::ZERO);
    }

    #[proptest]
    fn swap_never_tears_the_active_flag(#[strategy(0usize..64)] swaps: usize) {
        let mut b = BufferPair::new();
        for _ in 0..swaps {
            b.swap().unwrap();
        }
        let expected = if swaps % 2 == 0 { BufferId::A } else { BufferId::B };
        assert_eq!(b.active_id(), expected);
    }
}
