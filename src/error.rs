//! Error types for nex-rmc.

use thiserror::Error;

/// Failure while reading typed values out of a parameter stream.
///
/// Every variant carries the byte offset at which the failing read started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes remain than the field width or declared length requires.
    #[error("truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A length or value is structurally invalid.
    #[error("malformed data at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// Variant tag not recognized.
    #[error("unknown variant tag {tag:#04x} at offset {offset}")]
    UnknownTag { offset: usize, tag: u8 },
}

impl DecodeError {
    /// Byte offset at which the failing read started.
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::Truncated { offset, .. }
            | DecodeError::Malformed { offset, .. }
            | DecodeError::UnknownTag { offset, .. } => *offset,
        }
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            offset,
            reason: reason.into(),
        }
    }
}

/// Main error type for all nex-rmc operations.
#[derive(Debug, Error)]
pub enum RmcError {
    /// I/O error while writing responses.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter or frame decode failure.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Protocol error (invalid response layout, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No registry exists for the frame's protocol ID.
    #[error("unknown protocol ID: {0:#04x}")]
    UnknownProtocol(u8),

    /// No handler registered for a valid protocol/method pair.
    #[error("method {method_id:#x} not implemented on protocol {protocol_id:#04x}")]
    UnknownMethod { protocol_id: u8, method_id: u32 },

    /// Response channel closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Response channel is at capacity.
    #[error("response writer is full")]
    WriterFull,
}

/// Result type alias using RmcError.
pub type Result<T> = std::result::Result<T, RmcError>;
