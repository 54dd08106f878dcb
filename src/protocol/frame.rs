//! Inbound request frame.
//!
//! Uses `bytes::Bytes` so the parameter range is shared, not copied, between
//! the frame and every cursor reading it.
//!
//! # Example
//!
//! ```
//! use nex_rmc::protocol::{build_request, RequestFrame};
//!
//! let raw = build_request(0x19, 0x02, 42, &[1, 0, 0, 0]);
//! let frame = RequestFrame::decode(raw.into()).unwrap();
//!
//! assert_eq!(frame.protocol_id(), 0x19);
//! assert_eq!(frame.call_id(), 42);
//! assert_eq!(frame.parameters(), &[1, 0, 0, 0]);
//! ```

use bytes::Bytes;

use super::wire_format::{RequestHeader, REQUEST_HEADER_SIZE};
use crate::error::DecodeError;

/// One method invocation received from the transport engine.
#[derive(Debug, Clone)]
pub struct RequestFrame {
    /// Decoded header.
    pub header: RequestHeader,
    /// Parameter bytes (zero-copy via `bytes::Bytes`).
    pub parameters: Bytes,
}

impl RequestFrame {
    /// Create a frame from header and parameters.
    pub fn new(header: RequestHeader, parameters: Bytes) -> Self {
        Self { header, parameters }
    }

    /// Split a complete frame into header and parameters.
    pub fn decode(mut raw: Bytes) -> Result<Self, DecodeError> {
        let header = RequestHeader::decode(&raw)?;
        let parameters = raw.split_off(REQUEST_HEADER_SIZE);
        Ok(Self { header, parameters })
    }

    #[inline]
    pub fn protocol_id(&self) -> u8 {
        self.header.protocol_id
    }

    #[inline]
    pub fn method_id(&self) -> u32 {
        self.header.method_id
    }

    #[inline]
    pub fn call_id(&self) -> u32 {
        self.header.call_id
    }

    /// Get a reference to the parameter bytes.
    #[inline]
    pub fn parameters(&self) -> &[u8] {
        &self.parameters
    }
}

/// Build a complete request frame as a single byte vector.
pub fn build_request(protocol_id: u8, method_id: u32, call_id: u32, parameters: &[u8]) -> Vec<u8> {
    let header = RequestHeader::new(protocol_id, method_id, call_id);
    let mut buf = Vec::with_capacity(REQUEST_HEADER_SIZE + parameters.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(parameters);
    buf
}
