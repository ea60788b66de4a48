//! Error types for KNX tunnelling operations.

use thiserror::Error;

/// Result type alias for KNX operations.
pub type Result<T> = std::result::Result<T, KnxError>;

/// KNX tunnelling error type.
///
/// One variant per failure category named in the component design; all
/// carry just enough context to explain *what* failed, not a full
/// backtrace hierarchy.
#[derive(Debug, Error)]
pub enum KnxError {
    /// A group or individual address string or numeric value could not be parsed.
    #[error("invalid address: {0}")]
    BadAddress(String),

    /// A value passed to a datapoint encoder/decoder is outside its representable range.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A frame, cEMI telegram or HPAI structure failed to parse or did not fit a buffer.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// An operation that requires an active tunnel was attempted while disconnected.
    #[error("tunnel is not connected")]
    NotConnected,

    /// The gateway responded with a non-zero status code.
    #[error("gateway returned error status 0x{status:02x}")]
    ProtocolError { status: u8 },

    /// A blocking operation did not complete within its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The caller asked for something the protocol does not support in this context.
    #[error("invalid operation: {0}")]
    BadOperation(String),

    /// Underlying socket I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KnxError {
    pub(crate) fn bad_address(msg: impl Into<String>) -> Self {
        Self::BadAddress(msg.into())
    }

    pub(crate) fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub(crate) fn malformed_frame(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    pub(crate) fn protocol_error(status: u8) -> Self {
        Self::ProtocolError { status }
    }

    pub(crate) fn bad_operation(msg: impl Into<String>) -> Self {
        Self::BadOperation(msg.into())
    }
}
