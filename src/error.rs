//! Error types for IEC 60870-5-104 protocol.

use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for IEC 104 operations.
pub type Result<T> = std::result::Result<T, Iec104Error>;

/// IEC 60870-5-104 protocol error types.
///
/// Uses `Cow<'static, str>` to avoid allocations for static error messages.
#[derive(Debug, Error)]
pub enum Iec104Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(Cow<'static, str>),

    /// Not connected to remote
    #[error("Not connected")]
    NotConnected,

    /// Connection timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(Cow<'static, str>),

    /// Invalid frame format
    #[error("Invalid frame: {0}")]
    InvalidFrame(Cow<'static, str>),

    /// Invalid ASDU
    #[error("Invalid ASDU: {0}")]
    InvalidAsdu(Cow<'static, str>),

    /// Framing error: malformed APCI header (bad start byte, inconsistent length, short I-frame)
    #[error("Framing error: {0}")]
    FramingError(Cow<'static, str>),

    /// ASDU payload could not be decoded (mandatory information object missing or malformed)
    #[error("Decode error: {0}")]
    DecodeError(Cow<'static, str>),

    /// Unknown type identifier
    #[error("Unknown type ID: {0}")]
    UnknownTypeId(u8),

    /// Sequence number mismatch
    #[error("Sequence number mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u16, actual: u16 },

    /// T1 timeout (send confirmation)
    #[error("T1 timeout: no confirmation received")]
    T1Timeout,

    /// T2 timeout (no data acknowledgment)
    #[error("T2 timeout: acknowledgment timeout")]
    T2Timeout,

    /// T3 timeout (test frame)
    #[error("T3 timeout: connection test failed")]
    T3Timeout,

    /// Too many unconfirmed frames
    #[error("Too many unconfirmed frames (K={0})")]
    TooManyUnconfirmed(u16),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,

    /// Codec error
    #[error("Codec error: {0}")]
    Codec(Cow<'static, str>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(Cow<'static, str>),
}

impl Iec104Error {
    /// Create a protocol error with a static message (zero allocation).
    #[inline]
    pub const fn protocol_static(msg: &'static str) -> Self {
        Self::Protocol(Cow::Borrowed(msg))
    }

    /// Create a protocol error with a dynamic message.
    #[inline]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(Cow::Owned(msg.into()))
    }

    /// Create an invalid frame error with a static message (zero allocation).
    #[inline]
    pub const fn invalid_frame_static(msg: &'static str) -> Self {
        Self::InvalidFrame(Cow::Borrowed(msg))
    }

    /// Create an invalid frame error with a dynamic message.
    #[inline]
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(Cow::Owned(msg.into()))
    }

    /// Create an invalid ASDU error with a static message (zero allocation).
    #[inline]
    pub const fn invalid_asdu_static(msg: &'static str) -> Self {
        Self::InvalidAsdu(Cow::Borrowed(msg))
    }

    /// Create an invalid ASDU error with a dynamic message.
    #[inline]
    pub fn invalid_asdu(msg: impl Into<String>) -> Self {
        Self::InvalidAsdu(Cow::Owned(msg.into()))
    }

    /// Create a framing error with a static message (zero allocation).
    #[inline]
    pub const fn framing_static(msg: &'static str) -> Self {
        Self::FramingError(Cow::Borrowed(msg))
    }

    /// Create a framing error with a dynamic message.
    #[inline]
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::FramingError(Cow::Owned(msg.into()))
    }

    /// Create a decode error with a static message (zero allocation).
    #[inline]
    pub const fn decode_static(msg: &'static str) -> Self {
        Self::DecodeError(Cow::Borrowed(msg))
    }

    /// Create a decode error with a dynamic message.
    #[inline]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(Cow::Owned(msg.into()))
    }

    /// Create an internal error with a static message (zero allocation).
    #[inline]
    pub const fn internal_static(msg: &'static str) -> Self {
        Self::Internal(Cow::Borrowed(msg))
    }

    /// Create an internal error with a dynamic message.
    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(Cow::Owned(msg.into()))
    }

    /// Whether this error is fatal to the connection (link state machine closes on it) as
    /// opposed to recoverable (caller observes it but the connection stays open).
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FramingError(_)
                | Self::InvalidFrame(_)
                | Self::InvalidAsdu(_)
                | Self::SequenceMismatch { .. }
                | Self::DecodeError(_)
                | Self::T1Timeout
                | Self::Io(_)
        )
    }

    /// Check if this error indicates a connection problem.
    #[inline]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::NotConnected | Self::ConnectionTimeout | Self::T3Timeout
        )
    }

    /// Check if this error is retryable.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout | Self::T1Timeout | Self::T2Timeout | Self::T3Timeout
        )
    }
}
