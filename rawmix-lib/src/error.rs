use std::fmt::{Display, Formatter};

/// Error type for PCM mixing, alignment, and interleaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixError {
    /// The descriptor itself is outside the supported integer PCM space.
    UnsupportedFormat(String),
    /// A stream announced a format that differs from the session format.
    FormatMismatch { expected: String, actual: String },
    /// A host-supplied start offset lies before the start of the mix.
    InvalidOffset { offset_ms: i64 },
    /// An exact-size extraction asked for more bytes than are buffered.
    InsufficientData { requested: usize, available: usize },
    /// A payload length is not a whole number of samples or frames.
    MisalignedPayload { len: usize, unit: usize },
    /// A stream key does not refer to a live stream.
    UnknownStream,
}

impl Display for MixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat(detail) => write!(f, "unsupported sample format: {}", detail),
            Self::FormatMismatch { expected, actual } => {
                write!(f, "format mismatch: expected {}, got {}", expected, actual)
            }
            Self::InvalidOffset { offset_ms } => {
                write!(f, "invalid stream offset: {} ms", offset_ms)
            }
            Self::InsufficientData {
                requested,
                available,
            } => write!(
                f,
                "insufficient data: requested {} bytes, {} available",
                requested, available
            ),
            Self::MisalignedPayload { len, unit } => write!(
                f,
                "misaligned payload: {} bytes is not a multiple of {}",
                len, unit
            ),
            Self::UnknownStream => write!(f, "unknown or removed stream"),
        }
    }
}

impl std::error::Error for MixError {}
