//! Error types for tinycodec

use thiserror::Error;

/// Result type alias for tinycodec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tinycodec
///
/// Every variant is fatal to the encode/decode call that produced it. Nothing
/// is retried internally; a caller that wants to retry (for example after
/// re-fetching a codebook asset) does so itself.
#[derive(Error, Debug)]
pub enum Error {
    /// Plane or frame dimensions are not usable for 4x4 tiling
    #[error("Invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: &'static str,
    },

    /// Quantization parameter outside [0, 51]
    #[error("QP {0} out of range [0, 51]")]
    QpOutOfRange(i64),

    /// The bit source ran dry in the middle of a symbol or block
    #[error("Truncated bitstream at bit {position}")]
    TruncatedBitstream { position: usize },

    /// A bit sequence that matches no codebook entry
    #[error("Unknown symbol code at bit {position}")]
    UnknownSymbol { position: usize },

    /// The encoder was asked to emit a symbol the codebook cannot represent
    #[error("Symbol (run {run}, value {value}) has no code in the codebook")]
    UncodableSymbol { run: u8, value: i32 },

    /// A decoded run would run past the end of the 16-coefficient block
    #[error("Corrupt block: run {run} at scan position {position} overflows the block")]
    CorruptBlock { position: usize, run: u8 },

    /// A decoded DC delta gives a DC no block can produce
    #[error("DC delta {delta} from {previous} leaves the valid DC range")]
    DcOutOfRange { previous: i32, delta: i32 },

    /// Codebook asset missing or malformed
    #[error("Codebook unavailable: {0}")]
    CodebookUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container (Y4M) error
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid dimensions error
    pub fn invalid_dimensions(width: usize, height: usize, reason: &'static str) -> Self {
        Error::InvalidDimensions {
            width,
            height,
            reason,
        }
    }

    /// Create a codebook error
    pub fn codebook<S: Into<String>>(msg: S) -> Self {
        Error::CodebookUnavailable(msg.into())
    }

    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// True for errors that indicate a damaged or mismatched bitstream
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedBitstream { .. }
                | Error::UnknownSymbol { .. }
                | Error::CorruptBlock { .. }
                | Error::DcOutOfRange { .. }
        )
    }
}
