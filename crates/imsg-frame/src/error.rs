/// Errors that can occur while encoding, sending, or receiving imsg frames.
#[derive(Debug, thiserror::Error)]
pub enum ImsgError {
    /// The payload exceeds the protocol maximum. Nothing was written.
    #[error("message too large ({size} bytes, max {max})")]
    SizeExceeded { size: usize, max: usize },

    /// Fewer than `HEADER_SIZE` bytes were supplied to the header decoder.
    #[error("short imsg header ({len} bytes, need 16)")]
    Format { len: usize },

    /// A received header declares a frame length outside the valid range.
    #[error("invalid imsg frame length {length}")]
    InvalidLength { length: u16 },

    /// An I/O error from the underlying stream, unchanged.
    #[error("imsg I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end-of-file at a frame boundary, or accepted no bytes on write.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream reached end-of-file part way through a frame.
    #[error("connection closed mid-frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, ImsgError>;
