//! Wire format of inbound RMC requests.
//!
//! Implements the 9-byte request header:
//! ```text
//! ┌──────────┬───────────┬──────────┬────────────────┐
//! │ Protocol │ Method ID │ Call ID  │ Parameters     │
//! │ 1 byte   │ 4 bytes   │ 4 bytes  │ rest of frame  │
//! │ uint8    │ uint32 LE │ uint32 LE│ opaque         │
//! └──────────┴───────────┴──────────┴────────────────┘
//! ```
//!
//! The frame length itself comes from the transport engine.

use crate::error::DecodeError;

/// Request header size in bytes (fixed, exactly 9).
pub const REQUEST_HEADER_SIZE: usize = 9;

/// Bit set on the method ID of a successful response.
pub const RESPONSE_METHOD_FLAG: u32 = 0x8000;

/// Bit set on every error code carried by a response.
pub const ERROR_MASK: u32 = 0x8000_0000;

/// Result codes carried by error responses.
pub mod result_codes {
    /// Core::Unknown.
    pub const CORE_UNKNOWN: u32 = 0x0001_0001;
    /// Core::NotImplemented.
    pub const CORE_NOT_IMPLEMENTED: u32 = 0x0001_0002;
}

/// Decoded request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// Protocol identifier.
    pub protocol_id: u8,
    /// Method identifier within the protocol.
    pub method_id: u32,
    /// Caller-chosen identifier echoed in the response.
    pub call_id: u32,
}

impl RequestHeader {
    /// Create a new header.
    pub fn new(protocol_id: u8, method_id: u32, call_id: u32) -> Self {
        Self {
            protocol_id,
            method_id,
            call_id,
        }
    }

    /// Encode header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut buf = [0u8; REQUEST_HEADER_SIZE];
        buf[0] = self.protocol_id;
        buf[1..5].copy_from_slice(&self.method_id.to_le_bytes());
        buf[5..9].copy_from_slice(&self.call_id.to_le_bytes());
        buf
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Fails with `Truncated` if fewer than 9 bytes are available.
    ///
    /// # Example
    ///
    /// ```
    /// use nex_rmc::protocol::RequestHeader;
    ///
    /// let bytes = [0x15, 0x1E, 0, 0, 0, 7, 0, 0, 0];
    /// let header = RequestHeader::decode(&bytes).unwrap();
    /// assert_eq!(header.protocol_id, 0x15);
    /// assert_eq!(header.method_id, 0x1E);
    /// assert_eq!(header.call_id, 7);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < REQUEST_HEADER_SIZE {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: REQUEST_HEADER_SIZE,
                remaining: buf.len(),
            });
        }
        Ok(Self {
            protocol_id: buf[0],
            method_id: u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
            call_id: u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]),
        })
    }
}
