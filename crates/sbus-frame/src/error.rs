/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No buffer could be reserved for the encoded frame.
    #[error("unable to allocate {size} bytes for frame")]
    Allocation { size: usize },

    /// A length does not fit the 32-bit wire field.
    #[error("{field} length {len} does not fit a 32-bit length field")]
    FieldOverflow { field: &'static str, len: usize },

    /// The descriptor count exceeds the protocol maximum.
    #[error("too many descriptors ({count}, max {max})")]
    TooManyDescriptors { count: usize, max: usize },

    /// Fewer bytes than a complete header were received.
    #[error("frame header truncated ({received} bytes, need {needed})")]
    TruncatedHeader { received: usize, needed: usize },

    /// A header field carries a negative count or length.
    #[error("negative {field} in frame header: {value}")]
    NegativeField { field: &'static str, value: i32 },

    /// The declared lengths exceed the bytes actually received.
    #[error("frame declares {declared} bytes but only {received} were received")]
    LengthMismatch { declared: usize, received: usize },
}

impl FrameError {
    /// True when the error describes a malformed frame rather than a local resource problem.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, FrameError::Allocation { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
