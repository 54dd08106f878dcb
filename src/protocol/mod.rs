//! Protocol module - request framing and response encoding.
//!
//! - 9-byte request header decoding
//! - [`RequestFrame`] with zero-copy parameter bytes
//! - [`RmcResponse`] success/error encoding

mod frame;
mod response;
mod wire_format;

pub use frame::{build_request, RequestFrame};
pub use response::{ResponseBody, RmcResponse};
pub use wire_format::{result_codes, RequestHeader, ERROR_MASK, REQUEST_HEADER_SIZE, RESPONSE_METHOD_FLAG};
