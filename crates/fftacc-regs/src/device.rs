//! Host-facing device model: the register file in front of the core.
//!
//! [`FftDevice`] decodes word-aligned 32-bit reads and writes at the
//! offsets in [`crate::regmap`], latches configuration, forwards commands
//! to the [`TransformController`] and mirrors its state back out through
//! `FFT_STATUS`, `SCALE_FACTOR` and `OVERFLOW_STATUS`. Completion is
//! observable three ways: polling the status register, polling the
//! write-1-to-clear `INT_STATUS` register, or an optional event callback
//! gated by `INT_ENABLE`.
//!
//! The data windows carry one complex sample per word and cover the first
//! 1024 samples of each buffer; longer transforms load and drain through
//! the block-transfer methods ([`FftDevice::load_input`],
//! [`FftDevice::output`]), which stand in for the burst interface.

use fftacc_core::{
    BufferId, Event, RescaleMode, State, TransformConfig, TransformController, N_MAX,
};
use fftacc_fixed::{FixedComplex, RoundMode};

use crate::regmap::{self, config, ctrl, int, overflow, rescale, scale, status};

/// Samples addressable through each memory window.
pub const WINDOW_SAMPLES: usize = (regmap::WINDOW_BYTES / 4) as usize;

/// Rejected register accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegError {
    /// No register or window at this offset.
    Unmapped(u32),
    /// Offset is not word-aligned.
    Misaligned(u32),
    /// Write to a read-only register or window.
    ReadOnly(u32),
    /// Access requires an idle device (configuration and input writes are
    /// locked while a transform is in flight).
    Busy(u32),
}

impl std::fmt::Display for RegError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmapped(o) => write!(f, "no register mapped at offset {o:#x}"),
            Self::Misaligned(o) => write!(f, "offset {o:#x} is not word-aligned"),
            Self::ReadOnly(o) => write!(f, "register at offset {o:#x} is read-only"),
            Self::Busy(o) => {
                write!(f, "access at offset {o:#x} rejected: transform in flight")
            }
        }
    }
}

impl std::error::Error for RegError {}

/// Terminal-event callback; receives at most one event per transform.
pub type EventCallback = Box<dyn FnMut(Event) + Send>;

/// The accelerator behind its memory-mapped face.
#[derive(derive_more::Debug)]
pub struct FftDevice {
    core: TransformController,
    /// Latched FFT_CTRL enable bits.
    ctrl: u32,
    config: u32,
    length: u32,
    rescale: u32,
    int_enable: u32,
    int_status: u32,
    #[debug(skip)]
    on_event: Option<EventCallback>,
}

impl FftDevice {
    pub fn new() -> Self {
        Self {
            core: TransformController::new(),
            ctrl: 0,
            config: 0,
            length: 0,
            rescale: 0,
            int_enable: 0,
            int_status: 0,
            on_event: None,
        }
    }

    /// Registers a callback for terminal events; only events whose
    /// `INT_ENABLE` bit is set are delivered.
    pub fn set_event_callback(&mut self, cb: EventCallback) {
        self.on_event = Some(cb);
    }

    /// Advances the device by one tick, latching any terminal event into
    /// `INT_STATUS` and delivering it to the callback if enabled.
    pub fn tick(&mut self) {
        let Some(event) = self.core.tick() else {
            return;
        };
        let bit = match event {
            Event::Done => int::DONE,
            Event::Error(_) => int::ERROR,
        };
        self.int_status |= bit;
        if self.int_enable & bit != 0 {
            if let Some(cb) = self.on_event.as_mut() {
                cb(event);
            }
        }
    }

    /// Reads a register or window word.
    pub fn read(&self, offset: u32) -> Result<u32, RegError> {
        if offset % 4 != 0 {
            return Err(RegError::Misaligned(offset));
        }
        match offset {
            regmap::FFT_CTRL => Ok(self.ctrl),
            regmap::FFT_STATUS => Ok(self.read_status()),
            regmap::FFT_CONFIG => Ok(self.config),
            regmap::FFT_LENGTH => Ok(self.length),
            regmap::INT_ENABLE => Ok(self.int_enable),
            regmap::INT_STATUS => Ok(self.int_status),
            regmap::BUFFER_SELECT => Ok(self.core.buffers().active_id().bit() as u32),
            regmap::SCALE_FACTOR => Ok(self.read_scale_factor()),
            regmap::RESCALE_CTRL => Ok(self.rescale),
            regmap::OVERFLOW_STATUS => Ok(self.read_overflow_status()),
            _ => self.read_window(offset),
        }
    }

    /// Writes a register or window word.
    pub fn write(&mut self, offset: u32, value: u32) -> Result<(), RegError> {
        if offset % 4 != 0 {
            return Err(RegError::Misaligned(offset));
        }
        match offset {
            regmap::FFT_CTRL => self.write_ctrl(value),
            regmap::FFT_CONFIG => self.write_latched(offset, value, |d, v| d.config = v),
            regmap::FFT_LENGTH => self.write_latched(offset, value, |d, v| d.length = v),
            regmap::RESCALE_CTRL => self.write_latched(offset, value, |d, v| d.rescale = v),
            regmap::INT_ENABLE => {
                self.int_enable = value & (int::DONE | int::ERROR);
                Ok(())
            }
            regmap::INT_STATUS => {
                // Write-1-to-clear.
                self.int_status &= !value;
                Ok(())
            }
            regmap::BUFFER_SELECT => self.write_buffer_select(offset, value),
            regmap::FFT_STATUS | regmap::SCALE_FACTOR | regmap::OVERFLOW_STATUS => {
                Err(RegError::ReadOnly(offset))
            }
            _ => self.write_window(offset, value),
        }
    }

    /// Bulk-loads samples into a buffer's input region, bypassing the
    /// 1024-sample window limit.
    pub fn load_input(&mut self, id: BufferId, samples: &[FixedComplex]) -> Result<(), RegError> {
        if self.core.is_busy() {
            return Err(RegError::Busy(regmap::INPUT_A_BASE));
        }
        self.core.buffers_mut().load_input(id, samples);
        Ok(())
    }

    /// First `n` output samples of a buffer (block-transfer read path).
    pub fn output(&self, id: BufferId, n: usize) -> &[FixedComplex] {
        self.core.buffers().output_slice(id, n)
    }

    pub fn core(&self) -> &TransformController {
        &self.core
    }

    fn write_ctrl(&mut self, value: u32) -> Result<(), RegError> {
        self.ctrl = value & ctrl::LATCHED_MASK;
        if value & ctrl::RESET != 0 {
            // Reset wins over anything else in the same write.
            self.core.reset();
            self.int_status = 0;
            return Ok(());
        }
        if value & ctrl::SWAP != 0 {
            self.core
                .swap_buffers()
                .map_err(|_| RegError::Busy(regmap::FFT_CTRL))?;
        }
        if value & ctrl::START != 0 {
            let cfg = self.assemble_config();
            let log2 = (self.config & config::LOG2_MASK) as u8;
            // Shape validation happens inside the controller; only a
            // not-idle device rejects the write itself.
            self.core
                .start_with_log2(cfg, log2)
                .map_err(|_| RegError::Busy(regmap::FFT_CTRL))?;
        }
        Ok(())
    }

    fn assemble_config(&self) -> TransformConfig {
        TransformConfig {
            n: self.length as usize,
            rescale_mode: if self.config & config::FINAL_DIVIDE != 0 {
                RescaleMode::FinalDivideByN
            } else {
                RescaleMode::PerStage
            },
            round_mode: if self.config & config::ROUND != 0 {
                RoundMode::Round
            } else {
                RoundMode::Truncate
            },
            saturate: self.config & config::SATURATE != 0,
            overflow_detect: self.config & config::OVERFLOW_DETECT != 0,
            rescale_enabled: self.ctrl & ctrl::RESCALE_EN != 0
                && self.rescale & rescale::ENABLE != 0,
            scale_tracking: self.ctrl & ctrl::TRACK_EN != 0 && self.rescale & rescale::TRACK != 0,
            threshold: ((self.rescale & rescale::THRESHOLD_MASK) >> rescale::THRESHOLD_SHIFT)
                as u8,
        }
    }

    fn write_latched(
        &mut self,
        offset: u32,
        value: u32,
        apply: fn(&mut Self, u32),
    ) -> Result<(), RegError> {
        if self.core.is_busy() {
            tracing::warn!(offset, "configuration write rejected mid-transform");
            return Err(RegError::Busy(offset));
        }
        apply(self, value);
        Ok(())
    }

    fn write_buffer_select(&mut self, offset: u32, value: u32) -> Result<(), RegError> {
        let wanted = BufferId::from_bit(value as u8);
        if wanted == self.core.buffers().active_id() {
            return Ok(());
        }
        self.core
            .swap_buffers()
            .map(|_| ())
            .map_err(|_| RegError::Busy(offset))
    }

    fn read_status(&self) -> u32 {
        let mut v = 0;
        if self.core.is_busy() {
            v |= status::BUSY;
        }
        if self.core.done() {
            v |= status::DONE;
        }
        if self.core.error() {
            v |= status::ERROR;
        }
        if self.core.buffers().active_id() == BufferId::B {
            v |= status::ACTIVE_BUFFER;
        }
        if self.core.state() == State::Rescale {
            v |= status::RESCALING;
        }
        if self.core.overflow_detected() {
            v |= status::OVERFLOW;
        }
        let progress = self.core.progress();
        v |= (progress.stage as u32 & status::STAGE_MASK) << status::STAGE_SHIFT;
        v |= (progress.butterfly & status::BUTTERFLY_MASK) << status::BUTTERFLY_SHIFT;
        v |= (self.core.error_code() as u32 & status::ERROR_CODE_MASK) << status::ERROR_CODE_SHIFT;
        v
    }

    fn read_scale_factor(&self) -> u32 {
        let s = self.core.stats();
        let mut v = (s.scale_factor as u32) << scale::FACTOR_SHIFT
            | (s.stage_count as u32) << scale::STAGE_COUNT_SHIFT
            | (s.overflow_count as u32) << scale::OVERFLOW_COUNT_SHIFT;
        if s.valid {
            v |= scale::VALID;
        }
        if s.scale_factor_saturated {
            v |= scale::SATURATED;
        }
        v
    }

    fn read_overflow_status(&self) -> u32 {
        let s = self.core.stats();
        (s.overflow_count as u32) << overflow::COUNT_SHIFT
            | (s.last_overflow_stage as u32) << overflow::LAST_STAGE_SHIFT
            | (s.max_overflow_magnitude as u32) << overflow::MAX_MAGNITUDE_SHIFT
    }

    fn read_window(&self, offset: u32) -> Result<u32, RegError> {
        let (base, index) = Self::window_index(offset)?;
        let word = match base {
            regmap::INPUT_A_BASE => {
                self.core.buffers().read_input(BufferId::A, index).to_word()
            }
            regmap::INPUT_B_BASE => {
                self.core.buffers().read_input(BufferId::B, index).to_word()
            }
            regmap::OUTPUT_A_BASE => {
                self.core.buffers().read_output(BufferId::A, index).to_word()
            }
            regmap::OUTPUT_B_BASE => {
                self.core.buffers().read_output(BufferId::B, index).to_word()
            }
            _ => self.core.twiddle().packed_word(index),
        };
        Ok(word)
    }

    fn write_window(&mut self, offset: u32, value: u32) -> Result<(), RegError> {
        let (base, index) = Self::window_index(offset)?;
        match base {
            regmap::INPUT_A_BASE | regmap::INPUT_B_BASE => {
                if self.core.is_busy() {
                    tracing::warn!(offset, "input write rejected mid-transform");
                    return Err(RegError::Busy(offset));
                }
                let id = if base == regmap::INPUT_A_BASE {
                    BufferId::A
                } else {
                    BufferId::B
                };
                self.core
                    .buffers_mut()
                    .write_input(id, index, FixedComplex::from_word(value));
                Ok(())
            }
            _ => Err(RegError::ReadOnly(offset)),
        }
    }

    fn window_index(offset: u32) -> Result<(u32, usize), RegError> {
        let windows = [
            regmap::INPUT_A_BASE,
            regmap::INPUT_B_BASE,
            regmap::OUTPUT_A_BASE,
            regmap::OUTPUT_B_BASE,
            regmap::TWIDDLE_BASE,
        ];
        for base in windows {
            if offset >= base && offset < base + regmap::WINDOW_BYTES {
                let index = ((offset - base) / 4) as usize;
                debug_assert!(index < WINDOW_SAMPLES && WINDOW_SAMPLES <= N_MAX);
                return Ok((base, index));
            }
        }
        Err(RegError::Unmapped(offset))
    }
}

impl Default for FftDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misaligned_access_is_rejected() {
        let mut d = FftDevice::new();
        assert_eq!(d.read(0x0002), Err(RegError::Misaligned(0x0002)));
        assert_eq!(d.write(0x1001, 0), Err(RegError::Misaligned(0x1001)));
    }

    #[test]
    fn unmapped_offsets_are_rejected() {
        let d = FftDevice::new();
        assert_eq!(d.read(0x0F00), Err(RegError::Unmapped(0x0F00)));
        assert_eq!(d.read(0x6000), Err(RegError::Unmapped(0x6000)));
    }

    #[test]
    fn status_registers_are_read_only() {
        let mut d = FftDevice::new();
        for offset in [regmap::FFT_STATUS, regmap::SCALE_FACTOR, regmap::OVERFLOW_STATUS] {
            assert_eq!(d.write(offset, 1), Err(RegError::ReadOnly(offset)));
        }
        assert_eq!(
            d.write(regmap::OUTPUT_A_BASE, 1),
            Err(RegError::ReadOnly(regmap::OUTPUT_A_BASE))
        );
        assert_eq!(
            d.write(regmap::TWIDDLE_BASE + 8, 1),
            Err(RegError::ReadOnly(regmap::TWIDDLE_BASE + 8))
        );
    }

    #[test]
    fn input_window_round_trips() {
        let mut d = FftDevice::new();
        let word = 0x7FFF_8000;
        d.write(regmap::INPUT_A_BASE + 4, word).unwrap();
        assert_eq!(d.read(regmap::INPUT_A_BASE + 4).unwrap(), word);
        // Buffer B is independent.
        assert_eq!(d.read(regmap::INPUT_B_BASE + 4).unwrap(), 0);
    }

    #[test]
    fn twiddle_rom_starts_at_unity() {
        let d = FftDevice::new();
        assert_eq!(d.read(regmap::TWIDDLE_BASE).unwrap(), 0x7FFF_0000);
    }

    #[test]
    fn buffer_select_swaps_when_idle() {
        let mut d = FftDevice::new();
        assert_eq!(d.read(regmap::BUFFER_SELECT).unwrap(), 0);
        d.write(regmap::BUFFER_SELECT, 1).unwrap();
        assert_eq!(d.read(regmap::BUFFER_SELECT).unwrap(), 1);
        assert_ne!(d.read(regmap::FFT_STATUS).unwrap() & status::ACTIVE_BUFFER, 0);
        // Selecting the already-active set is a no-op.
        d.write(regmap::BUFFER_SELECT, 1).unwrap();
        assert_eq!(d.read(regmap::BUFFER_SELECT).unwrap(), 1);
    }

    #[test]
    fn int_status_is_write_one_to_clear() {
        let mut d = FftDevice::new();
        d.write(regmap::FFT_LENGTH, 256).unwrap();
        d.write(regmap::FFT_CONFIG, 8 | config::OVERFLOW_DETECT).unwrap();
        d.write(regmap::FFT_CTRL, ctrl::START).unwrap();
        for _ in 0..8192 {
            d.tick();
        }
        assert_eq!(d.read(regmap::INT_STATUS).unwrap(), int::DONE);
        d.write(regmap::INT_STATUS, int::DONE).unwrap();
        assert_eq!(d.read(regmap::INT_STATUS).unwrap(), 0);
    }
}
