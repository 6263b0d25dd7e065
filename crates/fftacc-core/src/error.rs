//! Error types for the accelerator core.
//!
//! The taxonomy follows the hardware's: configuration errors are
//! recoverable (reconfigure and restart), internal consistency faults abort
//! the transform, and a buffer swap against a busy pair is a caller
//! contract violation reported immediately. Arithmetic overflow is not an
//! error anywhere in this crate; it is the condition the rescale unit and
//! scale tracker exist to handle.

/// Host-visible error code, surfaced in the status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    #[default]
    None = 0,
    /// Transform length rejected at configuration time.
    InvalidConfig = 1,
    /// Address generation produced an out-of-range index (logic defect).
    AddressFault = 2,
}

/// Reasons a transform configuration is rejected.
///
/// Lengths are never silently clamped; the host must reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Length is not a power of two.
    NotPowerOfTwo(usize),
    /// Length is outside the supported `[256, 4096]` range.
    LengthOutOfRange(usize),
    /// The log2-length field and the explicit point count disagree.
    LengthMismatch { log2: u8, length: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPowerOfTwo(n) => {
                write!(f, "transform length {n} is not a power of two")
            }
            Self::LengthOutOfRange(n) => {
                write!(f, "transform length {n} outside supported range [256, 4096]")
            }
            Self::LengthMismatch { log2, length } => {
                write!(f, "log2-length field {log2} disagrees with length {length}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised by the core while a transform is set up or in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Configuration rejected; no transform was started.
    Config(ConfigError),
    /// Address generation escaped the buffer; the transform is aborted.
    AddressFault { stage: u8, addr: usize, len: usize },
    /// Buffer swap requested while a transform holds the pair.
    SwapWhileBusy,
    /// Operation requires the controller to be idle.
    NotIdle,
}

impl CoreError {
    /// Maps the error to the status-register code.
    pub fn code(self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::InvalidConfig,
            Self::AddressFault { .. } => ErrorCode::AddressFault,
            Self::SwapWhileBusy | Self::NotIdle => ErrorCode::None,
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration rejected: {e}"),
            Self::AddressFault { stage, addr, len } => write!(
                f,
                "internal consistency fault: stage {stage} generated address {addr} \
                 outside buffer of length {len}"
            ),
            Self::SwapWhileBusy => {
                write!(f, "buffer swap requested while a transform is in flight")
            }
            Self::NotIdle => write!(f, "operation requires an idle controller"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}
