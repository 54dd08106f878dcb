//! Outbound RMC responses.
//!
//! ```text
//! success: size u32 | protocol u8 | 1 | call_id u32 | method_id|0x8000 u32 | data
//! error:   size u32 | protocol u8 | 0 | code|0x80000000 u32 | call_id u32
//! ```
//!
//! `size` counts every byte after itself. All integers are Little Endian.

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{result_codes, ERROR_MASK, RESPONSE_METHOD_FLAG};
use crate::error::{RmcError, Result};

/// Outcome carried by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Method succeeded; `data` is the encoded return value.
    Success { method_id: u32, data: Bytes },
    /// Method failed with a result code.
    Error { code: u32 },
}

/// A response addressed to one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmcResponse {
    pub protocol_id: u8,
    pub call_id: u32,
    pub body: ResponseBody,
}

impl RmcResponse {
    /// Successful response carrying `data`.
    pub fn success(protocol_id: u8, method_id: u32, call_id: u32, data: Bytes) -> Self {
        Self {
            protocol_id,
            call_id,
            body: ResponseBody::Success { method_id, data },
        }
    }

    /// Error response carrying a result code.
    pub fn error(protocol_id: u8, call_id: u32, code: u32) -> Self {
        Self {
            protocol_id,
            call_id,
            body: ResponseBody::Error {
                code: code | ERROR_MASK,
            },
        }
    }

    /// The response sent when no handler exists for a call.
    pub fn not_implemented(protocol_id: u8, call_id: u32) -> Self {
        Self::error(protocol_id, call_id, result_codes::CORE_NOT_IMPLEMENTED)
    }

    /// Result code if this is an error response.
    pub fn error_code(&self) -> Option<u32> {
        match self.body {
            ResponseBody::Error { code } => Some(code),
            ResponseBody::Success { .. } => None,
        }
    }

    #[inline]
    pub fn is_not_implemented(&self) -> bool {
        self.error_code() == Some(result_codes::CORE_NOT_IMPLEMENTED | ERROR_MASK)
    }

    /// Encode to bytes, size prefix included.
    pub fn encode(&self) -> Bytes {
        let body_len = match &self.body {
            ResponseBody::Success { data, .. } => 1 + 1 + 4 + 4 + data.len(),
            ResponseBody::Error { .. } => 1 + 1 + 4 + 4,
        };

        let mut buf = BytesMut::with_capacity(4 + body_len);
        buf.put_u32_le(body_len as u32);
        buf.put_u8(self.protocol_id);

        match &self.body {
            ResponseBody::Success { method_id, data } => {
                buf.put_u8(1);
                buf.put_u32_le(self.call_id);
                buf.put_u32_le(method_id | RESPONSE_METHOD_FLAG);
                buf.put_slice(data);
            }
            ResponseBody::Error { code } => {
                buf.put_u8(0);
                buf.put_u32_le(*code);
                buf.put_u32_le(self.call_id);
            }
        }

        buf.freeze()
    }

    /// Decode one response, size prefix included.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(RmcError::Protocol("response shorter than size prefix".to_string()));
        }
        let size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let body = &buf[4..];
        if body.len() != size || size < 10 {
            return Err(RmcError::Protocol(format!(
                "response size {} does not match body length {}",
                size,
                body.len()
            )));
        }

        let protocol_id = body[0];
        let word = |at: usize| u32::from_le_bytes([body[at], body[at + 1], body[at + 2], body[at + 3]]);

        match body[1] {
            1 => Ok(Self {
                protocol_id,
                call_id: word(2),
                body: ResponseBody::Success {
                    method_id: word(6) & !RESPONSE_METHOD_FLAG,
                    data: Bytes::copy_from_slice(&body[10..]),
                },
            }),
            0 => Ok(Self {
                protocol_id,
                call_id: word(6),
                body: ResponseBody::Error { code: word(2) },
            }),
            other => Err(RmcError::Protocol(format!("invalid success flag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_layout() {
        let bytes = RmcResponse::not_implemented(0x19, 0x0102_0304).encode();

        assert_eq!(
            &bytes[..],
            &[
                10, 0, 0, 0, // size
                0x19, // protocol
                0,    // failure
                0x02, 0x00, 0x01, 0x80, // 0x80010002
                0x04, 0x03, 0x02, 0x01, // call id
            ]
        );
    }

    #[test]
    fn test_success_layout() {
        let response = RmcResponse::success(0x76, 2, 5, Bytes::from_static(b"ok"));
        let bytes = response.encode();

        assert_eq!(bytes.len(), 4 + 10 + 2);
        assert_eq!(bytes[5], 1);
        assert_eq!(&bytes[10..14], &[0x02, 0x80, 0, 0]);
        assert_eq!(RmcResponse::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_error_code_mask_applied_once() {
        let response = RmcResponse::error(0x15, 1, 0x8001_0002);
        assert_eq!(response.error_code(), Some(0x8001_0002));
        assert!(response.is_not_implemented());
    }

    #[test]
    fn test_decode_rejects_size_mismatch() {
        let mut bytes = RmcResponse::not_implemented(1, 1).encode().to_vec();
        bytes.push(0);
        assert!(RmcResponse::decode(&bytes).is_err());
    }
}
