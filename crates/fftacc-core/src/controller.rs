//! Transform sequencing state machine.
//!
//! The controller owns every piece of per-transform state — twiddle table,
//! double buffers, scale tracker and the staged pipeline — and sequences
//! one transform at a time through `Idle -> Config -> Load -> Compute ->
//! [Rescale ->] Done`. Configuration failures and pipeline faults divert
//! to `Error`, which latches until an explicit [`TransformController::reset`].
//! A transform produces exactly one terminal event, never both `Done` and
//! `Error`.
//!
//! Like the pipeline it drives, the controller is tick-driven: the host
//! (or the register surface sitting in front of it) calls
//! [`TransformController::tick`] repeatedly and watches for the returned
//! event.

use fftacc_fixed::RoundMode;

use crate::buffer::{BufferId, BufferPair};
use crate::context::{RescaleMode, TransformConfig, TransformContext};
use crate::error::{CoreError, ErrorCode};
use crate::pipeline::ButterflyPipeline;
use crate::scale_tracker::{ScaleFactorTracker, ScaleStats};
use crate::twiddle::TwiddleTable;

/// Controller phase, host-visible through the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Config,
    Load,
    Compute,
    Rescale,
    Done,
    Error,
}

/// Terminal notification for one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Done,
    Error(ErrorCode),
}

/// Live position of the in-flight transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub stage: u8,
    pub butterfly: u32,
}

/// Top-level transform engine.
#[derive(Debug)]
pub struct TransformController {
    state: State,
    twiddle: TwiddleTable,
    buffers: BufferPair,
    tracker: ScaleFactorTracker,
    pipeline: Option<ButterflyPipeline>,
    ctx: Option<TransformContext>,
    pending: Option<(TransformConfig, Option<u8>)>,
    error_code: ErrorCode,
    done_latched: bool,
    error_latched: bool,
    overflow_detected: bool,
    last_progress: Progress,
}

impl TransformController {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            twiddle: TwiddleTable::new(),
            buffers: BufferPair::new(),
            tracker: ScaleFactorTracker::new(),
            pipeline: None,
            ctx: None,
            pending: None,
            error_code: ErrorCode::None,
            done_latched: false,
            error_latched: false,
            overflow_detected: false,
            last_progress: Progress::default(),
        }
    }

    /// Requests a transform with the given configuration.
    ///
    /// Accepted from `Idle` or `Done` (back-to-back transforms); any other
    /// state, including a latched `Error`, rejects the request. Validation
    /// itself happens on the next tick, in the `Config` phase.
    pub fn start(&mut self, cfg: TransformConfig) -> Result<(), CoreError> {
        self.start_inner(cfg, None)
    }

    /// [`Self::start`] with an explicit log2-length cross-check, for hosts
    /// that program length and log2-length through separate fields.
    pub fn start_with_log2(&mut self, cfg: TransformConfig, log2: u8) -> Result<(), CoreError> {
        self.start_inner(cfg, Some(log2))
    }

    fn start_inner(&mut self, cfg: TransformConfig, log2: Option<u8>) -> Result<(), CoreError> {
        if !matches!(self.state, State::Idle | State::Done) {
            return Err(CoreError::NotIdle);
        }
        self.pending = Some((cfg, log2));
        self.ctx = None;
        self.error_code = ErrorCode::None;
        self.done_latched = false;
        self.error_latched = false;
        self.overflow_detected = false;
        self.last_progress = Progress::default();
        self.state = State::Config;
        Ok(())
    }

    /// Advances the state machine by one tick.
    pub fn tick(&mut self) -> Option<Event> {
        match self.state {
            State::Idle | State::Error => None,
            State::Config => self.tick_config(),
            State::Load => self.tick_load(),
            State::Compute => self.tick_compute(),
            State::Rescale => self.tick_rescale(),
            State::Done => {
                self.state = State::Idle;
                None
            }
        }
    }

    /// Forces the controller back to `Idle` from any state.
    ///
    /// An in-flight transform is abandoned, its statistics are marked
    /// invalid and all latches clear. Buffer contents are untouched.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.tracker.invalidate();
        self.buffers.set_busy(false);
        self.pipeline = None;
        self.ctx = None;
        self.pending = None;
        self.error_code = ErrorCode::None;
        self.done_latched = false;
        self.error_latched = false;
        self.overflow_detected = false;
        self.last_progress = Progress::default();
    }

    /// Flips the active/background buffer roles; rejected mid-transform.
    pub fn swap_buffers(&mut self) -> Result<BufferId, CoreError> {
        self.buffers.swap()
    }

    /// Ticks until the in-flight transform terminates.
    ///
    /// Returns `None` without ticking when nothing is in flight (idle, or
    /// an earlier transform's latched error), so a host that missed a
    /// failed start cannot spin here.
    pub fn run_to_completion(&mut self) -> Option<Event> {
        if !self.is_busy() {
            return None;
        }
        loop {
            if let Some(event) = self.tick() {
                return Some(event);
            }
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// True from acceptance of a start request until the terminal event.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            State::Config | State::Load | State::Compute | State::Rescale
        )
    }

    /// Latched completion flag; clears on the next start or reset.
    pub fn done(&self) -> bool {
        self.done_latched
    }

    /// Latched error flag; clears only on reset or a new start.
    pub fn error(&self) -> bool {
        self.error_latched
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// Sticky per-transform flag: some butterfly output left Q1.15.
    pub fn overflow_detected(&self) -> bool {
        self.overflow_detected
    }

    pub fn progress(&self) -> Progress {
        self.last_progress
    }

    pub fn stats(&self) -> &ScaleStats {
        self.tracker.stats()
    }

    pub fn buffers(&self) -> &BufferPair {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferPair {
        &mut self.buffers
    }

    pub fn twiddle(&self) -> &TwiddleTable {
        &self.twiddle
    }

    fn tick_config(&mut self) -> Option<Event> {
        let Some((cfg, log2)) = self.pending.take() else {
            tracing::error!("config phase entered without a pending request");
            return self.fail(ErrorCode::InvalidConfig);
        };
        let validated = match log2 {
            Some(log2) => cfg.validate_with_log2(log2),
            None => cfg.validate(),
        };
        match validated {
            Ok(log2n) => {
                self.tracker.on_transform_start(cfg.scale_tracking);
                self.buffers.set_busy(true);
                self.ctx = Some(TransformContext::new(cfg, log2n, self.buffers.active_id()));
                self.state = State::Load;
                None
            }
            Err(err) => {
                tracing::warn!(%err, "transform rejected");
                self.fail(CoreError::from(err).code())
            }
        }
    }

    fn tick_load(&mut self) -> Option<Event> {
        let Some(ctx) = self.ctx else {
            tracing::error!("load phase entered without a transform context");
            return self.fail(ErrorCode::InvalidConfig);
        };
        self.buffers.load_work(ctx.buffer, ctx.cfg.n);
        self.pipeline = Some(ButterflyPipeline::new(ctx.cfg.n, ctx.log2n));
        self.state = State::Compute;
        None
    }

    fn tick_compute(&mut self) -> Option<Event> {
        let Some(ctx) = self.ctx else {
            tracing::error!("compute phase entered without a transform context");
            return self.fail(ErrorCode::InvalidConfig);
        };
        let Some(mut pipeline) = self.pipeline.take() else {
            tracing::error!("compute phase entered without a pipeline");
            return self.fail(ErrorCode::InvalidConfig);
        };

        let ctl = ctx.cfg.stage_rescale_control();
        let work = self.buffers.work_slice(ctx.buffer, ctx.cfg.n);
        let result = pipeline.tick(work, &self.twiddle, ctl, &mut self.tracker);

        self.overflow_detected |= pipeline.overflow_detected();
        let (stage, butterfly) = pipeline.progress();
        self.last_progress = Progress {
            stage,
            butterfly: butterfly as u32,
        };

        match result {
            Err(err) => {
                tracing::error!(%err, "transform aborted");
                self.fail(err.code())
            }
            Ok(()) if pipeline.is_done() => match ctx.cfg.rescale_mode {
                RescaleMode::FinalDivideByN => {
                    self.state = State::Rescale;
                    None
                }
                RescaleMode::PerStage => self.finish(),
            },
            Ok(()) => {
                self.pipeline = Some(pipeline);
                None
            }
        }
    }

    /// Single end-of-transform pass dividing every sample by N.
    fn tick_rescale(&mut self) -> Option<Event> {
        let Some(ctx) = self.ctx else {
            tracing::error!("rescale phase entered without a transform context");
            return self.fail(ErrorCode::InvalidConfig);
        };
        let round = ctx.cfg.round_mode == RoundMode::Round;
        let log2n = ctx.log2n;
        let shift = |v: i16| -> i16 {
            let mut wide = v as i32;
            if round {
                wide += 1 << (log2n - 1);
            }
            (wide >> log2n) as i16
        };
        for sample in self.buffers.work_slice(ctx.buffer, ctx.cfg.n) {
            sample.re = shift(sample.re);
            sample.im = shift(sample.im);
        }
        self.tracker.add_final_scale(log2n);
        self.finish()
    }

    fn finish(&mut self) -> Option<Event> {
        self.pipeline = None;
        self.done_latched = true;
        self.buffers.set_busy(false);
        self.state = State::Done;
        Some(Event::Done)
    }

    fn fail(&mut self, code: ErrorCode) -> Option<Event> {
        self.pipeline = None;
        self.tracker.invalidate();
        self.error_code = code;
        self.error_latched = true;
        self.buffers.set_busy(false);
        self.state = State::Error;
        Some(Event::Error(code))
    }
}

impl Default for TransformController {
    fn default() -> Self {
        Self::new()
    }
}
