//! Register map: offsets, bit positions and window layout.
//!
//! All registers are 32 bits wide at word-aligned byte offsets. Data
//! windows expose one complex sample per word, real part in `[31:16]` and
//! imaginary part in `[15:0]`.

/// Control register (write). Bits 0..2 are one-shot commands; bits 4..5
/// are latched unit enables.
pub const FFT_CTRL: u32 = 0x0000;
/// Status register (read-only, assembled live).
pub const FFT_STATUS: u32 = 0x0004;
/// Transform shape and arithmetic-mode configuration.
pub const FFT_CONFIG: u32 = 0x0008;
/// Transform point count; cross-checked against the log2 field on start.
pub const FFT_LENGTH: u32 = 0x000C;
/// Active buffer select; writing the other set's id requests a swap.
pub const BUFFER_SELECT: u32 = 0x0010;
/// Interrupt enable mask.
pub const INT_ENABLE: u32 = 0x0014;
/// Interrupt status, write-1-to-clear.
pub const INT_STATUS: u32 = 0x0018;
/// Scale-factor and stage statistics (read-only).
pub const SCALE_FACTOR: u32 = 0x001C;
/// Rescale unit control: enable, tracking and detection threshold.
pub const RESCALE_CTRL: u32 = 0x0020;
/// Overflow statistics (read-only).
pub const OVERFLOW_STATUS: u32 = 0x0024;

/// Byte size of each data window (1024 sample words).
pub const WINDOW_BYTES: u32 = 0x1000;
pub const INPUT_A_BASE: u32 = 0x1000;
pub const INPUT_B_BASE: u32 = 0x2000;
pub const OUTPUT_A_BASE: u32 = 0x3000;
pub const OUTPUT_B_BASE: u32 = 0x4000;
/// Read-only quarter-wave twiddle ROM, cosine in `[31:16]`, sine in
/// `[15:0]`.
pub const TWIDDLE_BASE: u32 = 0x5000;

pub mod ctrl {
    /// Launch a transform with the current configuration (one-shot).
    pub const START: u32 = 1 << 0;
    /// Soft reset: back to idle from any state, statistics invalidated.
    pub const RESET: u32 = 1 << 1;
    /// Swap active/background buffer roles (one-shot; rejected while busy).
    pub const SWAP: u32 = 1 << 2;
    /// Rescale unit enable (latched; gated with RESCALE_CTRL bit 0).
    pub const RESCALE_EN: u32 = 1 << 4;
    /// Scale tracking enable (latched; gated with RESCALE_CTRL bit 3).
    pub const TRACK_EN: u32 = 1 << 5;
    /// Bits that persist across writes.
    pub const LATCHED_MASK: u32 = RESCALE_EN | TRACK_EN;
}

pub mod status {
    pub const BUSY: u32 = 1 << 0;
    pub const DONE: u32 = 1 << 1;
    pub const ERROR: u32 = 1 << 2;
    /// Active buffer set: 0 = A, 1 = B.
    pub const ACTIVE_BUFFER: u32 = 1 << 3;
    /// The end-of-transform divide-by-N pass is running.
    pub const RESCALING: u32 = 1 << 4;
    /// Sticky for the current transform: some butterfly output overflowed.
    pub const OVERFLOW: u32 = 1 << 5;
    /// Current pipeline stage, `[11:8]`.
    pub const STAGE_SHIFT: u32 = 8;
    pub const STAGE_MASK: u32 = 0xF;
    /// Current butterfly index within the stage, `[23:12]`.
    pub const BUTTERFLY_SHIFT: u32 = 12;
    pub const BUTTERFLY_MASK: u32 = 0xFFF;
    /// Error code, `[27:24]` (see `ErrorCode`).
    pub const ERROR_CODE_SHIFT: u32 = 24;
    pub const ERROR_CODE_MASK: u32 = 0xF;
}

pub mod config {
    /// log2 of the transform length, `[3:0]`.
    pub const LOG2_MASK: u32 = 0xF;
    /// Round (instead of truncate) when the rescale unit halves a sample.
    pub const ROUND: u32 = 1 << 13;
    /// Saturate (instead of wrap) when narrowing back to Q1.15.
    pub const SATURATE: u32 = 1 << 14;
    /// 1 = run unscaled and divide by N at the end; 0 = per-stage rescale.
    pub const FINAL_DIVIDE: u32 = 1 << 16;
    /// Master overflow-detection enable.
    pub const OVERFLOW_DETECT: u32 = 1 << 19;
}

pub mod rescale {
    /// Rescale unit enable (gated with FFT_CTRL bit 4).
    pub const ENABLE: u32 = 1 << 0;
    /// Legacy aliases of the FFT_CONFIG round/saturate bits; FFT_CONFIG is
    /// authoritative, these are accepted and ignored.
    pub const ROUND: u32 = 1 << 1;
    pub const SATURATE: u32 = 1 << 2;
    /// Scale tracking enable (gated with FFT_CTRL bit 5).
    pub const TRACK: u32 = 1 << 3;
    /// Overflow detection threshold, `[7:4]`.
    pub const THRESHOLD_SHIFT: u32 = 4;
    pub const THRESHOLD_MASK: u32 = 0xF0;
}

pub mod scale {
    /// Cumulative halvings, `[7:0]`.
    pub const FACTOR_SHIFT: u32 = 0;
    /// Completed stages, `[15:8]`.
    pub const STAGE_COUNT_SHIFT: u32 = 8;
    /// Overflow events, `[23:16]`.
    pub const OVERFLOW_COUNT_SHIFT: u32 = 16;
    /// Statistics are valid (a transform ran to a terminal state without
    /// an intervening reset).
    pub const VALID: u32 = 1 << 30;
    /// The scale factor saturated; reconstruction is unreliable.
    pub const SATURATED: u32 = 1 << 31;
}

pub mod overflow {
    /// Overflow event count, `[7:0]`.
    pub const COUNT_SHIFT: u32 = 0;
    /// Stage of the most recent overflow, `[15:8]`.
    pub const LAST_STAGE_SHIFT: u32 = 8;
    /// Worst overflow magnitude byte, `[23:16]`.
    pub const MAX_MAGNITUDE_SHIFT: u32 = 16;
}

pub mod int {
    pub const DONE: u32 = 1 << 0;
    pub const ERROR: u32 = 1 << 1;
}
