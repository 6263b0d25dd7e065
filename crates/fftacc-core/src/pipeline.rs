//! Six-stage butterfly pipeline.
//!
//! One butterfly advances through six ordered steps — AddressGen, Fetch,
//! Add, Sub, Multiply, RescaleAndWrite — modeled as an explicit slot array
//! indexed by pipeline depth (the software stand-in for the hardware's
//! per-stage flip-flop registers). Every call to [`ButterflyPipeline::tick`]
//! advances each in-flight butterfly by exactly one step and issues at most
//! one new butterfly, preserving the fixed per-cycle throughput of the
//! original design.
//!
//! Addressing is radix-2 decimation-in-frequency: stage `s` pairs samples
//! `spacing = n >> (s + 1)` apart, so input arrives in natural order and
//! output is left bit-reversed with no reordering pass. Butterflies within
//! a stage touch disjoint address pairs and may retire in any order; the
//! pipeline drains completely at every stage boundary so stage `s + 1`
//! never reads a value stage `s` has not committed.

use fftacc_fixed::{rescale, FixedComplex, RescaleControl, WideComplex};

use crate::error::CoreError;
use crate::scale_tracker::ScaleFactorTracker;
use crate::twiddle::TwiddleTable;

/// Number of pipeline steps a butterfly passes through.
pub const PIPELINE_DEPTH: usize = 6;

/// In-flight state of one butterfly, held at its current pipeline depth.
#[derive(Debug, Clone, Copy, Default)]
struct PipelineSlot {
    occupied: bool,
    /// FFT stage this butterfly belongs to.
    stage: u8,
    /// Index within the stage, `0..n/2`.
    butterfly: usize,
    addr_a: usize,
    addr_b: usize,
    twiddle: FixedComplex,
    a: FixedComplex,
    b: FixedComplex,
    sum: WideComplex,
    diff: WideComplex,
    prod: WideComplex,
}

/// Tick-driven staged butterfly engine for one transform.
#[derive(Debug)]
pub struct ButterflyPipeline {
    n: usize,
    log2n: u8,
    slots: [PipelineSlot; PIPELINE_DEPTH],
    issue_stage: u8,
    issue_butterfly: usize,
    /// Set after the last butterfly of a stage is issued; no new work
    /// enters until the pipeline is empty (cross-stage ordering).
    draining: bool,
    done: bool,
    committed_in_stage: usize,
    overflow_detected: bool,
}

impl ButterflyPipeline {
    pub fn new(n: usize, log2n: u8) -> Self {
        debug_assert_eq!(n, 1usize << log2n);
        Self {
            n,
            log2n,
            slots: [PipelineSlot::default(); PIPELINE_DEPTH],
            issue_stage: 0,
            issue_butterfly: 0,
            draining: false,
            done: false,
            committed_in_stage: 0,
            overflow_detected: false,
        }
    }

    /// True once every stage has issued and committed all butterflies.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Sticky: some rescale decision saw the overflow signature.
    pub fn overflow_detected(&self) -> bool {
        self.overflow_detected
    }

    /// Live progress for the status surface: current stage and the next
    /// butterfly index to issue within it.
    pub fn progress(&self) -> (u8, usize) {
        (self.issue_stage.min(self.log2n.saturating_sub(1)), self.issue_butterfly)
    }

    /// Advances every in-flight butterfly one step, then issues at most
    /// one new butterfly.
    ///
    /// `work` is the transform's working buffer (`n` samples); `ctl` is
    /// the effective per-stage rescale control. Shift decisions for both
    /// butterfly outputs are reported to `tracker`.
    pub fn tick(
        &mut self,
        work: &mut [FixedComplex],
        twiddle: &TwiddleTable,
        ctl: RescaleControl,
        tracker: &mut ScaleFactorTracker,
    ) -> Result<(), CoreError> {
        if self.done {
            return Ok(());
        }

        // Deepest first, so each butterfly can move into the slot freed
        // above it within the same tick.
        for depth in (0..PIPELINE_DEPTH).rev() {
            if !self.slots[depth].occupied {
                continue;
            }
            let mut slot = self.slots[depth];
            match depth {
                0 => self.address_gen(&mut slot),
                1 => self.fetch(&mut slot, work, twiddle)?,
                2 => {
                    let (sum, _) = slot.a.add(slot.b);
                    slot.sum = sum;
                }
                3 => {
                    let (diff, _) = slot.a.sub(slot.b);
                    slot.diff = diff;
                }
                4 => {
                    let (prod, _) = slot.diff.mul(slot.twiddle);
                    slot.prod = prod;
                }
                _ => {
                    self.rescale_and_write(&slot, work, ctl, tracker);
                    self.slots[depth].occupied = false;
                    self.committed_in_stage += 1;
                    if self.committed_in_stage == self.n / 2 {
                        tracker.on_stage_complete();
                        self.committed_in_stage = 0;
                    }
                    continue;
                }
            }
            self.slots[depth].occupied = false;
            self.slots[depth + 1] = slot;
        }

        self.issue();
        Ok(())
    }

    fn address_gen(&self, slot: &mut PipelineSlot) {
        let spacing = self.n >> (slot.stage + 1);
        let group = slot.butterfly / spacing;
        let j = slot.butterfly % spacing;
        slot.addr_a = group * 2 * spacing + j;
        slot.addr_b = slot.addr_a + spacing;
    }

    fn fetch(
        &self,
        slot: &mut PipelineSlot,
        work: &[FixedComplex],
        twiddle: &TwiddleTable,
    ) -> Result<(), CoreError> {
        self.check_addr(slot.addr_a, slot.stage, work.len())?;
        self.check_addr(slot.addr_b, slot.stage, work.len())?;
        slot.a = work[slot.addr_a];
        slot.b = work[slot.addr_b];
        slot.twiddle = twiddle.lookup(slot.stage, slot.butterfly, self.n);
        Ok(())
    }

    fn rescale_and_write(
        &mut self,
        slot: &PipelineSlot,
        work: &mut [FixedComplex],
        ctl: RescaleControl,
        tracker: &mut ScaleFactorTracker,
    ) {
        // Addresses were validated at Fetch and are immutable since.
        debug_assert!(slot.addr_a < work.len() && slot.addr_b < work.len());

        let sum = rescale(slot.sum, ctl);
        let prod = rescale(slot.prod, ctl);
        tracker.observe(sum.shifted, sum.magnitude, slot.stage);
        tracker.observe(prod.shifted, prod.magnitude, slot.stage);
        self.overflow_detected |= sum.detected || prod.detected;

        work[slot.addr_a] = sum.sample;
        work[slot.addr_b] = prod.sample;
    }

    /// An out-of-range generated address is structurally impossible given
    /// the indexing scheme; hitting this is a logic defect that aborts the
    /// transform rather than writing outside the buffer.
    fn check_addr(&self, addr: usize, stage: u8, len: usize) -> Result<(), CoreError> {
        if addr >= len {
            tracing::error!(addr, stage, len, "address generation escaped the buffer");
            return Err(CoreError::AddressFault { stage, addr, len });
        }
        Ok(())
    }

    fn issue(&mut self) {
        if self.done {
            return;
        }
        if self.draining {
            if self.slots.iter().any(|s| s.occupied) {
                return;
            }
            self.draining = false;
            self.issue_stage += 1;
            self.issue_butterfly = 0;
            if self.issue_stage == self.log2n {
                self.done = true;
                return;
            }
        }
        debug_assert!(!self.slots[0].occupied);
        self.slots[0] = PipelineSlot {
            occupied: true,
            stage: self.issue_stage,
            butterfly: self.issue_butterfly,
            ..Default::default()
        };
        self.issue_butterfly += 1;
        if self.issue_butterfly == self.n / 2 {
            self.draining = true;
        }
    }

    /// Generous upper bound on the ticks a transform of length `n` needs,
    /// including the drain bubble at every stage boundary.
    pub fn max_ticks(n: usize, log2n: u8) -> usize {
        (log2n as usize) * (n / 2 + PIPELINE_DEPTH + 2) + 16
    }
}
